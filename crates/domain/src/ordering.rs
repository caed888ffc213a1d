//! Fractional ordering keys for list positions.
//!
//! Keys are strings that sort lexicographically in display order. A key is an
//! integer part followed by an optional fraction, both written in base-62
//! digits. The first character of the integer part encodes its length:
//! `a`..`z` are non-negative integers of 2..27 characters, `Z`..`A` are
//! negative integers of 2..27 characters. The first key ever handed out is
//! `a0`, appending after it yields `a1`, `a2`, ... and inserting between two
//! adjacent integers extends the fraction (`a0V`).
//!
//! Keys are compatible with the JavaScript `fractional-indexing` package, so
//! rows written by other clients sort the same way here.
//!
//! Two clients inserting into the same gap at the same time compute the same
//! key. Display order breaks such ties by item id; no key sorts strictly
//! between two equal keys.

use crate::DomainError;

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO: u8 = DIGITS[0];
const LAST: u8 = DIGITS[61];

/// Smallest representable integer part; it can never be decremented.
const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Returns a key that sorts strictly between `prev` and `next`.
///
/// `None` means the bound is open: `key_between(None, Some(k))` sorts before
/// `k`, `key_between(Some(k), None)` sorts after `k`, and
/// `key_between(None, None)` is the key for an empty list.
pub fn key_between(prev: Option<&str>, next: Option<&str>) -> Result<String, DomainError> {
    if let Some(a) = prev {
        validate_key(a)?;
    }
    if let Some(b) = next {
        validate_key(b)?;
    }

    match (prev, next) {
        (None, None) => Ok("a0".to_string()),
        (None, Some(b)) => {
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ib == SMALLEST_INTEGER {
                return Ok(format!("{}{}", ib, midpoint(b"", Some(fb.as_bytes()))?));
            }
            if ib.len() < b.len() {
                return Ok(ib.to_string());
            }
            decrement_integer(ib)?
                .ok_or_else(|| DomainError::invalid_order_key("cannot sort before the smallest key"))
        }
        (Some(a), None) => {
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            match increment_integer(ia)? {
                Some(i) => Ok(i),
                None => Ok(format!("{}{}", ia, midpoint(fa.as_bytes(), None)?)),
            }
        }
        (Some(a), Some(b)) => {
            if a >= b {
                return Err(DomainError::invalid_order_key(format!(
                    "{} >= {}",
                    a, b
                )));
            }
            let ia = integer_part(a)?;
            let fa = &a[ia.len()..];
            let ib = integer_part(b)?;
            let fb = &b[ib.len()..];
            if ia == ib {
                return Ok(format!(
                    "{}{}",
                    ia,
                    midpoint(fa.as_bytes(), Some(fb.as_bytes()))?
                ));
            }
            let i = increment_integer(ia)?
                .ok_or_else(|| DomainError::invalid_order_key("cannot sort after the largest key"))?;
            if i.as_str() < b {
                return Ok(i);
            }
            Ok(format!("{}{}", ia, midpoint(fa.as_bytes(), None)?))
        }
    }
}

/// Midpoint of two fractions, `b = None` meaning one past the end.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Result<String, DomainError> {
    if let Some(b) = b {
        if a >= b {
            return Err(DomainError::invalid_order_key("fraction bounds out of order"));
        }
    }
    if a.last() == Some(&ZERO) || b.and_then(|b| b.last()) == Some(&ZERO) {
        return Err(DomainError::invalid_order_key("trailing zero in fraction"));
    }

    if let Some(b) = b {
        // Strip the common prefix, padding `a` with zeros. `b` can't run out
        // first because a < b.
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(ZERO) == b[n] {
            n += 1;
        }
        if n > 0 {
            let prefix = String::from_utf8_lossy(&b[..n]).into_owned();
            let rest_a = if n < a.len() { &a[n..] } else { &[][..] };
            return Ok(prefix + &midpoint(rest_a, Some(&b[n..]))?);
        }
    }

    let digit_a = match a.first() {
        Some(c) => digit_value(*c)?,
        None => 0,
    };
    let digit_b = match b {
        Some(b) => match b.first() {
            Some(c) => digit_value(*c)?,
            None => DIGITS.len(),
        },
        None => DIGITS.len(),
    };

    if digit_b - digit_a > 1 {
        // Math.round on the half, as the JS implementation does
        let mid = (digit_a + digit_b + 1) / 2;
        return Ok((DIGITS[mid] as char).to_string());
    }

    // First digits are consecutive.
    match b {
        Some(b) if b.len() > 1 => Ok((b[0] as char).to_string()),
        _ => {
            let rest = if a.is_empty() { &[][..] } else { &a[1..] };
            Ok(format!(
                "{}{}",
                DIGITS[digit_a] as char,
                midpoint(rest, None)?
            ))
        }
    }
}

fn digit_value(c: u8) -> Result<usize, DomainError> {
    DIGITS
        .iter()
        .position(|d| *d == c)
        .ok_or_else(|| DomainError::invalid_order_key(format!("invalid digit {:?}", c as char)))
}

fn integer_length(head: u8) -> Result<usize, DomainError> {
    match head {
        b'a'..=b'z' => Ok((head - b'a') as usize + 2),
        b'A'..=b'Z' => Ok((b'Z' - head) as usize + 2),
        _ => Err(DomainError::invalid_order_key(format!(
            "invalid integer head {:?}",
            head as char
        ))),
    }
}

fn integer_part(key: &str) -> Result<&str, DomainError> {
    let head = key
        .as_bytes()
        .first()
        .copied()
        .ok_or_else(|| DomainError::invalid_order_key("empty key"))?;
    let len = integer_length(head)?;
    if len > key.len() {
        return Err(DomainError::invalid_order_key(format!(
            "integer part of {} is truncated",
            key
        )));
    }
    Ok(&key[..len])
}

fn validate_key(key: &str) -> Result<(), DomainError> {
    if !key.is_ascii() {
        return Err(DomainError::invalid_order_key(format!("non-ascii key {}", key)));
    }
    if key == SMALLEST_INTEGER {
        return Err(DomainError::invalid_order_key("smallest integer is reserved"));
    }
    let int = integer_part(key)?;
    for c in key.bytes().skip(1) {
        digit_value(c)?;
    }
    let fraction = &key[int.len()..];
    if fraction.as_bytes().last() == Some(&ZERO) {
        return Err(DomainError::invalid_order_key(format!(
            "trailing zero in {}",
            key
        )));
    }
    Ok(())
}

fn increment_integer(x: &str) -> Result<Option<String>, DomainError> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digs: Vec<u8> = bytes[1..].to_vec();

    let mut carry = true;
    for d in digs.iter_mut().rev() {
        let next = digit_value(*d)? + 1;
        if next == DIGITS.len() {
            *d = ZERO;
        } else {
            *d = DIGITS[next];
            carry = false;
            break;
        }
    }

    if carry {
        if head == b'Z' {
            return Ok(Some(format!("a{}", ZERO as char)));
        }
        if head == b'z' {
            return Ok(None);
        }
        let h = head + 1;
        if h > b'a' {
            digs.push(ZERO);
        } else {
            digs.pop();
        }
        return Ok(Some(assemble(h, &digs)));
    }
    Ok(Some(assemble(head, &digs)))
}

fn decrement_integer(x: &str) -> Result<Option<String>, DomainError> {
    let bytes = x.as_bytes();
    let head = bytes[0];
    let mut digs: Vec<u8> = bytes[1..].to_vec();

    let mut borrow = true;
    for d in digs.iter_mut().rev() {
        let value = digit_value(*d)?;
        if value == 0 {
            *d = LAST;
        } else {
            *d = DIGITS[value - 1];
            borrow = false;
            break;
        }
    }

    if borrow {
        if head == b'a' {
            return Ok(Some(format!("Z{}", LAST as char)));
        }
        if head == b'A' {
            return Ok(None);
        }
        let h = head - 1;
        if h < b'Z' {
            digs.push(LAST);
        } else {
            digs.pop();
        }
        return Ok(Some(assemble(h, &digs)));
    }
    Ok(Some(assemble(head, &digs)))
}

fn assemble(head: u8, digs: &[u8]) -> String {
    let mut out = String::with_capacity(digs.len() + 1);
    out.push(head as char);
    out.extend(digs.iter().map(|d| *d as char));
    out
}
