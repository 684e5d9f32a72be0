//! Mission catalog: the ordered main line plus the treasure board.
//!
//! A `Catalog` is validated once when built and is read-only afterwards.

use std::collections::HashSet;

use crate::domain::{Mission, MissionKind};
use crate::error::CatalogError;
use crate::seeds::{seed_main_missions, seed_sub_missions, BOARD_SIZE};

#[derive(Clone, Debug)]
pub struct Catalog {
  main: Vec<Mission>,
  sub: Vec<Mission>,
}

impl Catalog {
  /// Validate and build. Main missions are sorted by `order`; treasure cells keep their order.
  pub fn new(mut main: Vec<Mission>, sub: Vec<Mission>) -> Result<Self, CatalogError> {
    if main.is_empty() {
      return Err(CatalogError::EmptyMainLine);
    }
    let mut seen = HashSet::new();
    for m in main.iter().chain(sub.iter()) {
      if !seen.insert(m.mission_id.as_str()) {
        return Err(CatalogError::DuplicateId(m.mission_id.clone()));
      }
      validate_mission(m)?;
    }
    for m in &main {
      if m.order.is_none() {
        return Err(CatalogError::MissingOrder(m.mission_id.clone()));
      }
    }
    main.sort_by_key(|m| m.order);
    Ok(Self { main, sub })
  }

  /// The shipped content.
  pub fn builtin() -> Result<Self, CatalogError> {
    Self::new(seed_main_missions(), seed_sub_missions())
  }

  /// Layer extra missions on top: same id replaces, new ids are appended to the
  /// list selected by `is_main_mission`. The result is re-validated.
  pub fn with_overrides(&self, extra: Vec<Mission>) -> Result<Self, CatalogError> {
    let mut main = self.main.clone();
    let mut sub = self.sub.clone();
    for m in extra {
      main.retain(|x| x.mission_id != m.mission_id);
      match sub.iter().position(|x| x.mission_id == m.mission_id) {
        Some(idx) if !m.is_main_mission => sub[idx] = m,
        Some(idx) => {
          sub.remove(idx);
          main.push(m);
        }
        None if m.is_main_mission => main.push(m),
        None => sub.push(m),
      }
    }
    Self::new(main, sub)
  }

  pub fn find(&self, mission_id: &str) -> Option<&Mission> {
    self.main.iter().chain(self.sub.iter()).find(|m| m.mission_id == mission_id)
  }

  pub fn main_missions(&self) -> &[Mission] {
    &self.main
  }

  pub fn sub_missions(&self) -> &[Mission] {
    &self.sub
  }

  pub fn is_main(&self, mission_id: &str) -> bool {
    self.main.iter().any(|m| m.mission_id == mission_id)
  }

  pub fn is_sub(&self, mission_id: &str) -> bool {
    self.sub.iter().any(|m| m.mission_id == mission_id)
  }

  /// Treasure cell at (`row`, `col`) of the 5x5 board, if the catalog fills it.
  pub fn board_cell(&self, row: usize, col: usize) -> Option<&Mission> {
    if row >= BOARD_SIZE || col >= BOARD_SIZE {
      return None;
    }
    self.sub.get(row * BOARD_SIZE + col)
  }

  pub fn len(&self) -> usize {
    self.main.len() + self.sub.len()
  }
}

fn validate_mission(m: &Mission) -> Result<(), CatalogError> {
  if m.points == 0 {
    return Err(CatalogError::NonPositivePoints(m.mission_id.clone()));
  }
  if m.kind == MissionKind::Quiz {
    let quiz = m.quiz.as_ref().ok_or_else(|| CatalogError::MissingQuiz(m.mission_id.clone()))?;
    if !quiz.options.iter().any(|o| o == &quiz.answer) {
      return Err(CatalogError::AnswerNotInOptions(m.mission_id.clone()));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Quiz;

  #[test]
  fn builtin_catalog_is_valid() {
    let c = Catalog::builtin().expect("valid");
    assert_eq!(c.main_missions().len(), 5);
    assert_eq!(c.sub_missions().len(), 25);
    assert_eq!(c.main_missions()[0].mission_id, "main-1");
    assert_eq!(c.find("main-3").map(|m| m.kind), Some(MissionKind::Quiz));
    assert!(c.find("treasure-7").is_some());
    assert!(c.find("nope").is_none());
    assert_eq!(c.board_cell(2, 2).map(|m| m.kind), Some(MissionKind::Ar));
    assert!(c.board_cell(5, 0).is_none());
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let main = seed_main_missions();
    let mut sub = seed_sub_missions();
    sub[0].mission_id = "main-1".into();
    assert_eq!(Catalog::new(main, sub).unwrap_err(), CatalogError::DuplicateId("main-1".into()));
  }

  #[test]
  fn quiz_answer_must_be_an_option() {
    let mut main = seed_main_missions();
    main[2].quiz = Some(Quiz {
      question: "?".into(),
      answer: "조용필".into(),
      options: vec!["이문세".into()],
      hint: None,
    });
    assert_eq!(
      Catalog::new(main, vec![]).unwrap_err(),
      CatalogError::AnswerNotInOptions("main-3".into())
    );

    let mut main = seed_main_missions();
    main[2].quiz = None;
    assert_eq!(Catalog::new(main, vec![]).unwrap_err(), CatalogError::MissingQuiz("main-3".into()));
  }

  #[test]
  fn main_line_is_sorted_by_order() {
    let mut main = seed_main_missions();
    main.reverse();
    let c = Catalog::new(main, vec![]).unwrap();
    let ids: Vec<_> = c.main_missions().iter().map(|m| m.mission_id.as_str()).collect();
    assert_eq!(ids, ["main-1", "main-2", "main-3", "main-4", "main-5"]);
  }

  #[test]
  fn overrides_replace_and_append() {
    let base = Catalog::builtin().unwrap();
    let mut replaced = base.find("treasure-1").cloned().unwrap();
    replaced.points = 60;
    let mut added = replaced.clone();
    added.mission_id = "treasure-26".into();

    let c = base.with_overrides(vec![replaced, added]).unwrap();
    assert_eq!(c.find("treasure-1").map(|m| m.points), Some(60));
    assert_eq!(c.sub_missions()[0].mission_id, "treasure-1");
    assert_eq!(c.sub_missions().len(), 26);
    assert_eq!(c.len(), 31);
  }
}
