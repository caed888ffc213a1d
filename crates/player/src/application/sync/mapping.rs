//! Conversions between domain values and table rows.

use partysheet_domain::{
    Character, InventoryItem, ItemId, PlayerId, SessionId, SharedScore, SHARED_SCORE_ROW_ID,
};
use partysheet_shared::{
    AdversityRow, AimgRow, InventoryRow, RemoteRow, ScoreRow, StatRow, StatusRow,
};

use super::{Effect, FieldWrite, WriteCommand};

/// Row for a field write, stamped with this client's session.
pub fn row_for(player: &PlayerId, write: FieldWrite, session: SessionId) -> RemoteRow {
    let session_id = Some(session.to_uuid());
    let player = player.to_string();
    match write {
        FieldWrite::Adversity(adversity) => RemoteRow::Adversity(AdversityRow {
            player,
            adversity: i64::from(adversity),
            session_id,
        }),
        FieldWrite::Status(status) => RemoteRow::Status(StatusRow {
            player,
            status,
            session_id,
        }),
        FieldWrite::Stat(stat, die) => RemoteRow::Stat(StatRow {
            player,
            stat: stat.as_str().to_string(),
            die: die.as_str().to_string(),
            session_id,
        }),
        FieldWrite::InventoryItem(item) => RemoteRow::Inventory(InventoryRow {
            id: item.id.to_uuid(),
            player,
            name: item.name,
            description: item.description,
            order: item.order,
            session_id,
        }),
        FieldWrite::SecondaryDial(value) => RemoteRow::Aimg(AimgRow {
            player,
            value: i64::from(value),
            session_id,
        }),
        FieldWrite::Score(score) => score_row(score, session),
    }
}

/// The shared-score row. It belongs to no player.
pub fn score_row(score: SharedScore, session: SessionId) -> RemoteRow {
    RemoteRow::Score(ScoreRow {
        id: SHARED_SCORE_ROW_ID,
        score: i64::from(score.value()),
        session_id: Some(session.to_uuid()),
    })
}

/// The write an immediate effect turns into. Debounced status returns `None`.
pub fn command_for(player: &PlayerId, effect: Effect, session: SessionId) -> Option<WriteCommand> {
    match effect {
        Effect::Upsert(write) => Some(WriteCommand::Upsert(row_for(player, write, session))),
        Effect::DeleteInventory(id) => Some(WriteCommand::DeleteInventory(id.to_uuid())),
        Effect::DebounceStatus(_) => None,
    }
}

pub fn item_from_row(row: InventoryRow) -> InventoryItem {
    InventoryItem {
        id: ItemId::from_uuid(row.id),
        name: row.name,
        description: row.description,
        order: row.order,
    }
}

/// Every field of `character` as rows, as another client would read them.
pub fn rows_for_character(character: &Character, session: SessionId) -> Vec<RemoteRow> {
    let id = &character.id;
    let mut rows = vec![
        row_for(id, FieldWrite::Adversity(character.adversity_tokens), session),
        row_for(id, FieldWrite::Status(character.status.clone()), session),
        row_for(id, FieldWrite::SecondaryDial(character.secondary_dial), session),
    ];
    rows.extend(
        character
            .stats
            .iter()
            .map(|(stat, die)| row_for(id, FieldWrite::Stat(*stat, *die), session)),
    );
    rows.extend(
        character
            .inventory
            .iter()
            .map(|item| row_for(id, FieldWrite::InventoryItem(item.clone()), session)),
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use partysheet_domain::{Die, Stat};

    #[test]
    fn rows_carry_session_and_natural_key() {
        let session = SessionId::new();
        let player = PlayerId::from("grant");

        let row = row_for(&player, FieldWrite::Stat(Stat::Fight, Die::D10), session);
        assert_eq!(row.session_id(), Some(session.to_uuid()));
        assert_eq!(row.natural_key(), vec!["grant".to_string(), "fight".to_string()]);

        let score = score_row(SharedScore::default(), session);
        assert_eq!(score.natural_key(), vec!["1".to_string()]);
    }

    #[test]
    fn debounced_status_has_no_immediate_command() {
        let player = PlayerId::from("grant");
        assert_eq!(
            command_for(&player, Effect::DebounceStatus("x".into()), SessionId::new()),
            None
        );
    }

    #[test]
    fn inventory_row_maps_back_to_item() {
        let item = InventoryItem {
            id: ItemId::new(),
            name: "Rope".into(),
            description: "50ft".into(),
            order: "a0".into(),
        };
        let row = row_for(
            &PlayerId::from("claire"),
            FieldWrite::InventoryItem(item.clone()),
            SessionId::new(),
        );
        let RemoteRow::Inventory(row) = row else {
            panic!("expected inventory row");
        };
        assert_eq!(item_from_row(row), item);
    }
}
