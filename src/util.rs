/// Accepts true/false, 1/0, yes/no and on/off in any case.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a non-empty, trimmed environment variable.
pub fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_usize(key: &str) -> Option<usize> {
    env_value(key).and_then(|v| v.parse().ok())
}

pub fn env_u64(key: &str) -> Option<u64> {
    env_value(key).and_then(|v| v.parse().ok())
}

pub fn env_bool(key: &str) -> Option<bool> {
    env_value(key).and_then(|v| parse_bool_str(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool_str(" True "), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_str("YES"), Some(true));
        assert_eq!(parse_bool_str("off"), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_env_helpers_ignore_blank_and_garbage() {
        let mut env = crate::test_support::ScopedEnv::lock();
        env.set("VEXLINE_TEST_NUMBER", "  42 ");
        assert_eq!(env_usize("VEXLINE_TEST_NUMBER"), Some(42));
        env.set("VEXLINE_TEST_NUMBER", "   ");
        assert_eq!(env_usize("VEXLINE_TEST_NUMBER"), None);
        env.set("VEXLINE_TEST_NUMBER", "forty-two");
        assert_eq!(env_u64("VEXLINE_TEST_NUMBER"), None);
        env.set("VEXLINE_TEST_NUMBER", "on");
        assert_eq!(env_bool("VEXLINE_TEST_NUMBER"), Some(true));
    }
}
