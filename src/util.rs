//! Small utility helpers used across modules.

/// Log-safe truncation for user-supplied strings (QR payloads, nicknames).
/// Cuts on a char boundary so Hangul input never splits mid-codepoint.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Longest nickname accepted, in characters. Keeps progress file names well
/// under the 255-byte limit.
pub const MAX_USER_ID_CHARS: usize = 20;

/// Trim a user-chosen nickname; `None` if nothing is left or it is too long.
pub fn normalize_user_id(raw: &str) -> Option<String> {
  let t = raw.trim();
  if t.is_empty() || t.chars().count() > MAX_USER_ID_CHARS {
    return None;
  }
  Some(t.to_string())
}

/// Part of a mission title before its first ':' ("첫 번째 기억: ..." -> "첫 번째 기억").
pub fn title_prefix(title: &str) -> &str {
  title.split(':').next().unwrap_or(title).trim()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "봉황동봉황동";
    let out = trunc_for_log(s, 4);
    assert!(out.starts_with("봉"));
    assert!(out.ends_with("(18 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn user_ids_are_trimmed() {
    assert_eq!(normalize_user_id("  민지 "), Some("민지".to_string()));
    assert_eq!(normalize_user_id("   "), None);
  }

  #[test]
  fn user_ids_are_capped_in_characters() {
    let twenty = "봉".repeat(MAX_USER_ID_CHARS);
    assert_eq!(normalize_user_id(&format!(" {twenty} ")), Some(twenty.clone()));
    assert_eq!(normalize_user_id(&format!("{twenty}황")), None);
    assert_eq!(normalize_user_id(&"봉".repeat(70)), None);
  }

  #[test]
  fn title_prefix_stops_at_colon() {
    assert_eq!(title_prefix("세 번째 기억: 낡은 LP판의 선율"), "세 번째 기억");
    assert_eq!(title_prefix("no colon"), "no colon");
  }
}
