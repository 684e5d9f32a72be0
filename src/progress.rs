//! Read-only views derived from a `ProgressRecord` and the catalog:
//! next mission, counts, bingo lines, treasure score, tab locks and ranking.
//!
//! Nothing here writes. Every function is a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::{BingoPolicy, Rules};
use crate::domain::{Mission, MissionKind, ProgressRecord};
use crate::seeds::{BOARD_SIZE, TREASURE_POINTS};
use crate::util::title_prefix;

/// Bonus per completed bingo line on the treasure tab.
pub const BINGO_LINE_BONUS: u64 = 50;

/// Main mission with the lowest `order` that is not completed yet.
pub fn next_main_mission<'a>(catalog: &'a Catalog, record: &ProgressRecord) -> Option<&'a Mission> {
  catalog.main_missions().iter().find(|m| !record.is_completed(&m.mission_id))
}

pub fn main_missions_completed_count(catalog: &Catalog, record: &ProgressRecord) -> usize {
  record.completed_mission_ids.iter().filter(|id| catalog.is_main(id)).count()
}

pub fn sub_missions_completed_count(catalog: &Catalog, record: &ProgressRecord) -> usize {
  record.completed_mission_ids.iter().filter(|id| catalog.is_sub(id)).count()
}

pub fn bingo_lines(catalog: &Catalog, record: &ProgressRecord, policy: BingoPolicy) -> usize {
  match policy {
    BingoPolicy::Simplified => sub_missions_completed_count(catalog, record) / BOARD_SIZE,
    BingoPolicy::Geometric => geometric_bingo_lines(catalog, record),
  }
}

/// AR cells cannot be played yet, so they count as free spaces on the board.
fn is_cleared(m: &Mission, record: &ProgressRecord) -> bool {
  m.kind == MissionKind::Ar || record.is_completed(&m.mission_id)
}

/// Full rows, full columns and the two full diagonals of the board.
fn geometric_bingo_lines(catalog: &Catalog, record: &ProgressRecord) -> usize {
  let done = |row: usize, col: usize| catalog.board_cell(row, col).map(|m| is_cleared(m, record)).unwrap_or(false);
  let rows = (0..BOARD_SIZE).filter(|&r| (0..BOARD_SIZE).all(|c| done(r, c))).count();
  let cols = (0..BOARD_SIZE).filter(|&c| (0..BOARD_SIZE).all(|r| done(r, c))).count();
  let diag = (0..BOARD_SIZE).all(|i| done(i, i)) as usize;
  let anti = (0..BOARD_SIZE).all(|i| done(i, BOARD_SIZE - 1 - i)) as usize;
  rows + cols + diag + anti
}

/// `sub completed × 30 + bingo lines × 50`.
pub fn treasure_score(catalog: &Catalog, record: &ProgressRecord, policy: BingoPolicy) -> u64 {
  sub_missions_completed_count(catalog, record) as u64 * TREASURE_POINTS as u64
    + bingo_lines(catalog, record, policy) as u64 * BINGO_LINE_BONUS
}

/// Whole-number percentage, never above 100.
fn percent(done: usize, total: usize) -> u32 {
  if total == 0 {
    return 0;
  }
  ((done.min(total) * 100) / total) as u32
}

pub fn main_completion_percent(catalog: &Catalog, record: &ProgressRecord) -> u32 {
  percent(main_missions_completed_count(catalog, record), catalog.main_missions().len())
}

/// Share of board cells cleared, free spaces included.
pub fn board_completion_percent(catalog: &Catalog, record: &ProgressRecord) -> u32 {
  let cleared = catalog.sub_missions().iter().filter(|m| is_cleared(m, record)).count();
  percent(cleared, BOARD_SIZE * BOARD_SIZE)
}

/// Header shown on the exploration screen.
pub fn current_mission_title(catalog: &Catalog, record: &ProgressRecord) -> String {
  match next_main_mission(catalog, record) {
    Some(m) => format!("{}단계: {}를 찾아서", m.order.unwrap_or_default(), title_prefix(&m.title)),
    None => "모든 기억을 되찾았습니다!".to_string(),
  }
}

/// Bottom navigation tabs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
  Story,
  Exploration,
  Treasure,
  Community,
}

impl Tab {
  pub const ALL: [Tab; 4] = [Tab::Story, Tab::Exploration, Tab::Treasure, Tab::Community];
}

/// Every tab is open unless `gate_treasure_tab` is set, in which case the
/// treasure tab waits for the whole main line.
pub fn is_tab_unlocked(tab: Tab, catalog: &Catalog, record: &ProgressRecord, rules: &Rules) -> bool {
  match tab {
    Tab::Treasure if rules.gate_treasure_tab => {
      main_missions_completed_count(catalog, record) >= catalog.main_missions().len()
    }
    _ => true,
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
  pub tab: Tab,
  pub unlocked: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
  pub rank: usize,
  pub user_id: String,
  pub score: u64,
  /// "Top N%" among all ranked users.
  pub top_percent: u32,
}

/// Competition ranking ("1224"): equal scores share a rank.
pub fn leaderboard(records: &[ProgressRecord]) -> Vec<RankEntry> {
  let mut sorted: Vec<&ProgressRecord> = records.iter().collect();
  sorted.sort_by(|a, b| b.total_score.cmp(&a.total_score).then_with(|| a.user_id.cmp(&b.user_id)));
  let total = sorted.len();
  let mut out = Vec::with_capacity(total);
  let mut rank = 0;
  let mut prev: Option<u64> = None;
  for (idx, r) in sorted.into_iter().enumerate() {
    if prev != Some(r.total_score) {
      rank = idx + 1;
      prev = Some(r.total_score);
    }
    out.push(RankEntry {
      rank,
      user_id: r.user_id.clone(),
      score: r.total_score,
      top_percent: ((rank * 100).div_ceil(total)) as u32,
    });
  }
  out
}

pub fn rank_of(user_id: &str, records: &[ProgressRecord]) -> Option<RankEntry> {
  leaderboard(records).into_iter().find(|e| e.user_id == user_id)
}

/// Everything the client needs to draw its screens, in one object.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
  pub record: ProgressRecord,
  pub next_main_mission_id: Option<String>,
  pub current_mission_title: String,
  pub main_completed: usize,
  pub main_total: usize,
  pub main_percent: u32,
  pub sub_completed: usize,
  pub board_percent: u32,
  pub bingo_lines: usize,
  pub treasure_score: u64,
  pub tabs: Vec<TabState>,
  pub rank: Option<RankEntry>,
}

pub fn summarize(catalog: &Catalog, record: ProgressRecord, rules: &Rules, rank: Option<RankEntry>) -> ProgressSummary {
  let tabs = Tab::ALL
    .into_iter()
    .map(|tab| TabState { tab, unlocked: is_tab_unlocked(tab, catalog, &record, rules) })
    .collect();
  ProgressSummary {
    next_main_mission_id: next_main_mission(catalog, &record).map(|m| m.mission_id.clone()),
    current_mission_title: current_mission_title(catalog, &record),
    main_completed: main_missions_completed_count(catalog, &record),
    main_total: catalog.main_missions().len(),
    main_percent: main_completion_percent(catalog, &record),
    sub_completed: sub_missions_completed_count(catalog, &record),
    board_percent: board_completion_percent(catalog, &record),
    bingo_lines: bingo_lines(catalog, &record, rules.bingo_policy),
    treasure_score: treasure_score(catalog, &record, rules.bingo_policy),
    tabs,
    rank,
    record,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn catalog() -> Catalog {
    Catalog::builtin().unwrap()
  }

  fn record_with(ids: &[&str]) -> ProgressRecord {
    let mut r = ProgressRecord::empty("tester");
    for id in ids {
      r.apply_completion(id, 0);
    }
    r
  }

  fn treasures(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("treasure-{i}")).collect()
  }

  #[test]
  fn next_main_mission_walks_the_story_line() {
    let c = catalog();
    let empty = ProgressRecord::empty("tester");
    assert_eq!(next_main_mission(&c, &empty).map(|m| m.mission_id.as_str()), Some("main-1"));

    let skipped = record_with(&["main-1", "main-3"]);
    assert_eq!(next_main_mission(&c, &skipped).map(|m| m.mission_id.as_str()), Some("main-2"));

    let all = record_with(&["main-1", "main-2", "main-3", "main-4", "main-5"]);
    assert!(next_main_mission(&c, &all).is_none());
    assert_eq!(current_mission_title(&c, &all), "모든 기억을 되찾았습니다!");
  }

  #[test]
  fn current_title_names_the_next_step() {
    let c = catalog();
    let r = record_with(&["main-1", "main-2"]);
    assert_eq!(current_mission_title(&c, &r), "3단계: 세 번째 기억를 찾아서");
  }

  #[test]
  fn counts_ignore_unknown_ids() {
    let c = catalog();
    let r = record_with(&["main-1", "main-2", "treasure-3", "ghost-9"]);
    assert_eq!(main_missions_completed_count(&c, &r), 2);
    assert_eq!(sub_missions_completed_count(&c, &r), 1);
    assert_eq!(main_completion_percent(&c, &r), 40);
    // treasure-3 plus the free AR centre
    assert_eq!(board_completion_percent(&c, &r), 8);
  }

  #[test]
  fn simplified_bingo_counts_fives() {
    let c = catalog();
    let ids = treasures(1..=10);
    let ten = record_with(&ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(bingo_lines(&c, &ten, BingoPolicy::Simplified), 2);
    assert_eq!(treasure_score(&c, &ten, BingoPolicy::Simplified), 10 * 30 + 2 * 50);

    let ids = treasures(1..=4);
    let four = record_with(&ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(bingo_lines(&c, &four, BingoPolicy::Simplified), 0);
    assert_eq!(treasure_score(&c, &four, BingoPolicy::Simplified), 120);
  }

  #[test]
  fn geometric_bingo_counts_real_lines() {
    let c = catalog();
    // Row 0 and column 0 share treasure-1.
    let ids = ["treasure-1", "treasure-2", "treasure-3", "treasure-4", "treasure-5", "treasure-6", "treasure-11", "treasure-16", "treasure-21"];
    let r = record_with(&ids);
    assert_eq!(bingo_lines(&c, &r, BingoPolicy::Geometric), 2);
    assert_eq!(bingo_lines(&c, &r, BingoPolicy::Simplified), 1);

    // Main diagonal through the free AR centre.
    let diag = record_with(&["treasure-1", "treasure-7", "treasure-19", "treasure-25"]);
    assert_eq!(bingo_lines(&c, &diag, BingoPolicy::Geometric), 1);

    // Ten scattered cells, no line.
    let ids = ["treasure-1", "treasure-2", "treasure-3", "treasure-4", "treasure-6", "treasure-8", "treasure-10", "treasure-12", "treasure-14", "treasure-20"];
    assert_eq!(bingo_lines(&c, &record_with(&ids), BingoPolicy::Geometric), 0);
  }

  #[test]
  fn tabs_open_unless_gated() {
    let c = catalog();
    let r = record_with(&["main-1"]);
    let open = Rules::default();
    assert!(Tab::ALL.iter().all(|t| is_tab_unlocked(*t, &c, &r, &open)));

    let gated = Rules { gate_treasure_tab: true, ..Rules::default() };
    assert!(!is_tab_unlocked(Tab::Treasure, &c, &r, &gated));
    assert!(is_tab_unlocked(Tab::Community, &c, &r, &gated));
    let done = record_with(&["main-1", "main-2", "main-3", "main-4", "main-5"]);
    assert!(is_tab_unlocked(Tab::Treasure, &c, &done, &gated));
  }

  #[test]
  fn leaderboard_shares_ranks_on_ties() {
    let mk = |id: &str, score: u64| ProgressRecord { total_score: score, ..ProgressRecord::empty(id) };
    let records = vec![mk("a", 100), mk("b", 300), mk("c", 100), mk("d", 0)];
    let board = leaderboard(&records);
    let ranks: Vec<_> = board.iter().map(|e| (e.user_id.as_str(), e.rank)).collect();
    assert_eq!(ranks, [("b", 1), ("a", 2), ("c", 2), ("d", 4)]);
    assert_eq!(board[0].top_percent, 25);
    assert_eq!(rank_of("d", &records).map(|e| e.top_percent), Some(100));
    assert!(rank_of("zed", &records).is_none());
  }

  #[test]
  fn summary_reflects_record() {
    let c = catalog();
    let r = record_with(&["main-1"]);
    let s = summarize(&c, r, &Rules::default(), None);
    assert_eq!(s.next_main_mission_id.as_deref(), Some("main-2"));
    assert_eq!(s.main_completed, 1);
    assert_eq!(s.main_total, 5);
    assert_eq!(s.tabs.len(), 4);
    assert!(s.tabs.iter().all(|t| t.unlocked));
  }
}
