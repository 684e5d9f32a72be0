//! Built-in mission content: the five-step main story line and the 25 treasure
//! cells of the bingo board. Extra missions can be layered on top from TOML.

use crate::domain::{Mission, MissionKind, Quiz, Story};
use crate::geo::GeoPoint;

/// Reward for each treasure cell.
pub const TREASURE_POINTS: u32 = 30;

/// Side length of the treasure board.
pub const BOARD_SIZE: usize = 5;

fn story(intro: &str, outro: &str) -> Story {
  Story { intro: intro.into(), outro: outro.into() }
}

fn quiz(question: &str, answer: &str, options: &[&str], hint: Option<&str>) -> Quiz {
  Quiz {
    question: question.into(),
    answer: answer.into(),
    options: options.iter().map(|o| o.to_string()).collect(),
    hint: hint.map(Into::into),
  }
}

fn main_mission(order: u32, title: &str, kind: MissionKind, story: Story, location: GeoPoint) -> Mission {
  Mission {
    mission_id: format!("main-{order}"),
    is_main_mission: true,
    title: title.into(),
    kind,
    story,
    location,
    quiz: None,
    guide_photo_url: None,
    qr_token: None,
    points: 100,
    order: Some(order),
  }
}

/// The story line, in order.
pub fn seed_main_missions() -> Vec<Mission> {
  let m1 = main_mission(
    1,
    "첫 번째 기억: 달콤한 우유 한 잔의 추억",
    MissionKind::Photo,
    story(
      "세상의 때를 함께 씻어내던 그곳, 목욕 후 마셨던 시원한 우유 한 잔의 달콤함을 기억하니? 그 우유는 유난히 노란색이었지.",
      "바나나맛 우유의 달콤함이 그때의 기억을 되살려주는구나.",
    ),
    GeoPoint::new(35.229116, 128.878596),
  );

  let mut m2 = main_mission(
    2,
    "두 번째 기억: 마을의 이야기가 흐르던 우물",
    MissionKind::Qr,
    story(
      "마을의 모든 소식이 모이던 곳. 그곳에서 길어 올린 건 차가운 물만이 아니었단다. 귀 기울이면 지금도 그 시절의 소리가 들릴지 몰라.",
      "아버지의 목소리가 그 시절의 정겨운 이야기를 들려주는구나.",
    ),
    GeoPoint::new(35.228483, 128.876678),
  );
  m2.qr_token = Some("bonghwang-memories".into());

  let mut m3 = main_mission(
    3,
    "세 번째 기억: 낡은 LP판의 선율",
    MissionKind::Quiz,
    story(
      "네가 태어나던 해, 아빠는 이곳에서 네 엄마에게 줄 LP판을 샀단다. 먼지가 쌓인 선율 속에도 우리의 시간이 담겨있지.",
      "조용필의 LP판이 회전하며 그 시절의 선율을 들려주는구나.",
    ),
    GeoPoint::new(35.229192, 128.879290),
  );
  m3.quiz = Some(quiz(
    "1988년에 가장 유행했던 가수는?",
    "조용필",
    &["조용필", "이문세", "변진섭", "신승훈"],
    Some("1988년은 서울 올림픽이 열린 해입니다. 이 시기에 가장 인기 있었던 가수를 생각해보세요."),
  ));

  let mut m4 = main_mission(
    4,
    "네 번째 기억: 아빠의 첫 사진",
    MissionKind::Photo,
    story(
      "이 필름 카메라를 처음 샀던 날, 아빠는 이 골목에서 사진사가 되었단다. 저 벽화 앞에서 네 엄마의 가장 예쁜 모습을 담았지.",
      "촬영된 사진이 흑백에서 컬러로 변하며 폴라로이드 사진처럼 인화되는구나.",
    ),
    GeoPoint::new(35.229361, 128.879839),
  );
  m4.guide_photo_url = Some("/images/guide-photo-4.jpg".into());

  let m5 = main_mission(
    5,
    "마지막 기억: 우리의 유산",
    MissionKind::Gps,
    story(
      "모든 기억을 따라 여기까지 왔구나. 진짜 보물은 숨겨져 있는 게 아니라, 함께 만드는 거란다. 저 아래 우리가 함께한 시간을 보렴.",
      "아버지의 목소리로 에필로그가 재생되며, 지금까지 찍었던 사진들로 구성된 슬라이드 쇼가 나타난다.",
    ),
    GeoPoint::new(35.229729, 128.880246),
  );

  vec![m1, m2, m3, m4, m5]
}

/// Treasure cells repeat this list when the board is larger than it.
const TREASURE_CELLS: [(&str, MissionKind); 20] = [
  ("오래된 이발소 간판", MissionKind::Photo),
  ("봉황 1935의 비밀", MissionKind::Quiz),
  ("가야의 거리 스탬프", MissionKind::Qr),
  ("고양이 벽화 셀카", MissionKind::Photo),
  ("김수로왕릉 인증", MissionKind::Gps),
  ("전통 찻집 발견", MissionKind::Photo),
  ("봉황동 역사 퀴즈", MissionKind::Quiz),
  ("숨겨진 골목길", MissionKind::Gps),
  ("벽화마을 전체", MissionKind::Photo),
  ("옛날 상점 간판", MissionKind::Photo),
  ("전통 음식점", MissionKind::Gps),
  ("마을 할머니 인터뷰", MissionKind::Quiz),
  ("보물 중앙", MissionKind::Ar),
  ("오래된 나무", MissionKind::Photo),
  ("마을 우물", MissionKind::Gps),
  ("전통 공예품", MissionKind::Qr),
  ("봉황 전설 퀴즈", MissionKind::Quiz),
  ("일몰 명소", MissionKind::Photo),
  ("마을 축제 흔적", MissionKind::Gps),
  ("숨겨진 보석", MissionKind::Qr),
];

fn treasure_quiz(template_idx: usize) -> Option<Quiz> {
  match template_idx {
    1 => Some(quiz(
      "'봉황 1935'는 원래 어떤 건물이었을까요?",
      "정미소",
      &["정미소", "방앗간", "대장간", "술집"],
      Some("쌀과 관련된 곳이었어요."),
    )),
    6 => Some(quiz(
      "봉황동 유적은 어느 고대 국가의 흔적일까요?",
      "금관가야",
      &["금관가야", "백제", "고구려", "신라"],
      Some("김수로왕이 세운 나라입니다."),
    )),
    11 => Some(quiz(
      "옛날 마을 사람들이 물을 길어 오던 곳은 어디였을까요?",
      "우물",
      &["우물", "개울", "저수지", "약수터"],
      None,
    )),
    16 => Some(quiz(
      "봉황이 깃든다고 전해지는 나무는?",
      "오동나무",
      &["오동나무", "소나무", "느티나무", "버드나무"],
      Some("가야금을 만드는 데에도 쓰이는 나무입니다."),
    )),
    _ => None,
  }
}

/// The treasure board in row-major order: cell `i` sits at row `i / 5`, column `i % 5`.
/// Cells are laid out on a small grid around the old town centre.
pub fn seed_sub_missions() -> Vec<Mission> {
  (0..BOARD_SIZE * BOARD_SIZE)
    .map(|i| {
      let template_idx = i % TREASURE_CELLS.len();
      let (title, kind) = TREASURE_CELLS[template_idx];
      let row = (i / BOARD_SIZE) as f64;
      let col = (i % BOARD_SIZE) as f64;
      Mission {
        mission_id: format!("treasure-{}", i + 1),
        is_main_mission: false,
        title: title.into(),
        kind,
        story: story(&format!("{title}을(를) 찾아보세요."), "보물을 발견했습니다!"),
        location: GeoPoint::new(35.2265 + row * 0.0008, 128.8755 + col * 0.0010),
        quiz: treasure_quiz(template_idx),
        guide_photo_url: None,
        qr_token: None,
        points: TREASURE_POINTS,
        order: None,
      }
    })
    .collect()
}
