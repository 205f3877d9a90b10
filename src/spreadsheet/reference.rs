//! A1-style cell reference conversions. All positions are 1-based.

/// Last column of a worksheet (XFD)
pub(crate) const MAX_COLUMNS: usize = 16_384;

/// Last row of a worksheet
pub(crate) const MAX_ROWS: usize = 1_048_576;

/// Converts column letters to a 1-based column number: A = 1, Z = 26, AA = 27, ...
/// Columns past XFD are rejected.
pub(crate) fn col_to_number(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .bytes()
        .map(|byte| (byte.to_ascii_uppercase() - b'A') as usize + 1)
        .try_fold(0usize, |number, digit| number.checked_mul(26)?.checked_add(digit))
        .filter(|col| *col <= MAX_COLUMNS)
}

/// Parses a 1-based row number, rejecting zero and rows past the sheet end.
pub(crate) fn row_to_number(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| (1..=MAX_ROWS).contains(row))
}

/// Converts a 1-based column number to letters: 1 = A, 28 = AB.
pub(crate) fn number_to_col(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.push(b'A' + (number % 26) as u8);
        number /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Parses a cell reference such as `B3` or `$B$3` into `(row, col)`.
pub(crate) fn reference_to_position(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_number(digits)?, col_to_number(letters)?))
}

/// Formats a 1-based `(row, col)` position as an A1 reference.
pub(crate) fn position_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", number_to_col(col), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns() {
        assert_eq!(col_to_number("A"), Some(1));
        assert_eq!(col_to_number("z"), Some(26));
        assert_eq!(col_to_number("AA"), Some(27));
        assert_eq!(col_to_number("XFD"), Some(16_384));
        assert_eq!(col_to_number(""), None);
        assert_eq!(col_to_number("A1"), None);
        assert_eq!(col_to_number("XFE"), None);
        assert_eq!(col_to_number("ZZZZZZZZZZZZZ"), None);
        assert_eq!(col_to_number("ZZZZZZZZZZZZZZZZZZZZ"), None);

        assert_eq!(number_to_col(1), "A");
        assert_eq!(number_to_col(26), "Z");
        assert_eq!(number_to_col(28), "AB");
        assert_eq!(number_to_col(16_384), "XFD");
    }

    #[test]
    fn references() {
        assert_eq!(reference_to_position("A1"), Some((1, 1)));
        assert_eq!(reference_to_position("$C$12"), Some((12, 3)));
        assert_eq!(reference_to_position("C0"), None);
        assert_eq!(reference_to_position("12"), None);
        assert_eq!(reference_to_position("C"), None);
        assert_eq!(reference_to_position("XFD1048576"), Some((1_048_576, 16_384)));
        assert_eq!(reference_to_position("A1048577"), None);
        assert_eq!(reference_to_position("XFE1"), None);
        assert_eq!(position_to_reference(7, 2), "B7");
    }
}
