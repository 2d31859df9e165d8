// Converts provider duration strings ("PT5H30M", "P1DT2H") into whole minutes

/// Parse an ISO-8601 style duration into minutes.
///
/// Days, hours and minutes are counted; seconds are accepted but dropped.
/// Returns `None` when the string is not a duration at all.
pub fn parse_iso_duration(value: &str) -> Option<u32> {
    let rest = value.trim().strip_prefix('P')?;

    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };

    let mut minutes: u32 = 0;

    for (amount, unit) in components(date_part)? {
        match unit {
            'D' => minutes = minutes.checked_add(amount.checked_mul(24 * 60)?)?,
            _ => return None,
        }
    }

    if let Some(time) = time_part {
        for (amount, unit) in components(time)? {
            match unit {
                'H' => minutes = minutes.checked_add(amount.checked_mul(60)?)?,
                'M' => minutes = minutes.checked_add(amount)?,
                'S' => {}
                _ => return None,
            }
        }
    }

    Some(minutes)
}

// Splits "5H30M" into [(5, 'H'), (30, 'M')]
fn components(part: &str) -> Option<Vec<(u32, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();

    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if c.is_ascii_uppercase() {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        } else {
            return None;
        }
    }

    // trailing number without a unit
    if !digits.is_empty() {
        return None;
    }

    Some(out)
}
