pub(crate) trait LineBuffer {
    /// Removes the bytes up to and including the first `\n` and returns them
    /// without the newline.
    fn take_line(&mut self) -> Option<Vec<u8>>;
}

impl LineBuffer for Vec<u8> {
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.iter().position(|&byte| byte == b'\n')?;
        let mut line = self.drain(..=end).collect::<Vec<u8>>();
        line.pop();
        Some(line)
    }
}

pub(crate) trait NumericPrefix {
    /// Leading run of ASCII digits, `None` if there is none.
    fn integer_prefix(&self) -> Option<&str>;

    /// Leading `digits.digits`, `None` if the value does not start that way.
    fn decimal_prefix(&self) -> Option<&str>;
}

impl NumericPrefix for str {
    fn integer_prefix(&self) -> Option<&str> {
        let len = self.bytes().take_while(u8::is_ascii_digit).count();
        (len > 0).then(|| &self[..len])
    }

    fn decimal_prefix(&self) -> Option<&str> {
        let whole = self.integer_prefix()?.len();
        let rest = &self[whole..];
        let fraction = rest.strip_prefix('.')?.integer_prefix()?.len();
        Some(&self[..whole + 1 + fraction])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_drains_through_newline() {
        let mut buffer = b"IR=1\nRED=2\nBPM".to_vec();
        assert_eq!(buffer.take_line(), Some(b"IR=1".to_vec()));
        assert_eq!(buffer.take_line(), Some(b"RED=2".to_vec()));
        assert_eq!(buffer.take_line(), None);
        assert_eq!(buffer, b"BPM");
    }

    #[test]
    fn take_line_keeps_empty_lines() {
        let mut buffer = b"\n\n".to_vec();
        assert_eq!(buffer.take_line(), Some(Vec::new()));
        assert_eq!(buffer.take_line(), Some(Vec::new()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn integer_prefix() {
        assert_eq!("123456".integer_prefix(), Some("123456"));
        assert_eq!("98%".integer_prefix(), Some("98"));
        assert_eq!("-5".integer_prefix(), None);
        assert_eq!("".integer_prefix(), None);
    }

    #[test]
    fn decimal_prefix() {
        assert_eq!("98.5%".decimal_prefix(), Some("98.5"));
        assert_eq!("72.0".decimal_prefix(), Some("72.0"));
        assert_eq!("72".decimal_prefix(), None);
        assert_eq!("72.".decimal_prefix(), None);
        assert_eq!(".5".decimal_prefix(), None);
    }
}
