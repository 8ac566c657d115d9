mod common;

use common::{candidate_block, FakeBody, Op};
use resume_inserter::{
    candidate::{ImageSet, Slot},
    config::Config,
    error::FolderError,
    inserter::insert_images,
    scanner::{next_anchor, scan_markers, MarkerScan},
};
use std::path::PathBuf;

fn full_set() -> ImageSet {
    let mut set = ImageSet::default();
    set.set(Slot::IdFront, PathBuf::from("张三/身份证01.jpg"));
    set.set(Slot::IdBack, PathBuf::from("张三/身份证02.jpg"));
    set.set(Slot::Diploma, PathBuf::from("张三/毕业证.jpg"));
    set.set(Slot::Degree, PathBuf::from("张三/学位证书.jpg"));
    set
}

#[test]
fn finds_range_between_markers() {
    let cfg = Config::default();
    let mut paras = vec!["封面".to_string()];
    paras.extend(candidate_block("张三"));
    let body = FakeBody::new(&paras);

    let anchor = next_anchor(&cfg, &body, "张三", 0).unwrap();
    assert_eq!(anchor, 1);
    assert_eq!(scan_markers(&cfg, &body, anchor), MarkerScan::Found { start: 2, end: 5 });
    assert_eq!(next_anchor(&cfg, &body, "张三", anchor + 1), None);
}

#[test]
fn anchor_matches_trimmed_substring() {
    let cfg = Config::default();
    let body = FakeBody::new(&["  应聘者：张三丰  "]);
    assert_eq!(next_anchor(&cfg, &body, "张三", 0), Some(0));
}

#[test]
fn reports_missing_markers() {
    let cfg = Config::default();

    let no_start = FakeBody::new(&["张三", "毕业证：", "学位证："]);
    assert_eq!(scan_markers(&cfg, &no_start, 0), MarkerScan::MissingStart);

    let no_end = FakeBody::new(&["张三", "身份证：", "", "毕业证："]);
    assert_eq!(
        scan_markers(&cfg, &no_end, 0),
        MarkerScan::MissingEnd { start: 1 }
    );
    assert_eq!(MarkerScan::MissingEnd { start: 1 }.missing(), Some("end"));
}

#[test]
fn later_start_marker_moves_range_start() {
    let cfg = Config::default();
    let body = FakeBody::new(&["张三", "身份证：", "身份证：", "", "毕业证：", "学位证："]);
    assert_eq!(scan_markers(&cfg, &body, 0), MarkerScan::Found { start: 2, end: 5 });
}

#[test]
fn fills_fixed_slots_with_labels() {
    let cfg = Config::default();
    let mut body = FakeBody::new(&candidate_block("张三"));
    let set = full_set();

    let filled = insert_images(&cfg, &mut body, "张三", 1, 4, &set).unwrap();
    assert_eq!(filled, Slot::ALL.to_vec());

    let width = 1_828_800;
    assert_eq!(
        body.ops,
        vec![
            Op::Clear(1),
            Op::Clear(2),
            Op::Clear(3),
            Op::Clear(4),
            Op::Text(1, "身份证：\n".into()),
            Op::Picture(1, set.id_front.clone().unwrap(), width),
            Op::Text(1, "\n".into()),
            Op::Picture(2, set.id_back.clone().unwrap(), width),
            Op::Text(2, "\n".into()),
            Op::Text(3, "毕业证：\n".into()),
            Op::Picture(3, set.diploma.clone().unwrap(), width),
            Op::Text(3, "\n".into()),
            Op::Text(4, "学位证：\n".into()),
            Op::Picture(4, set.degree.clone().unwrap(), width),
            Op::Text(4, "\n".into()),
        ]
    );
    assert_eq!(body.paragraphs[0], "姓名：张三");
}

#[test]
fn missing_back_of_id_card_leaves_slot_empty() {
    let cfg = Config::default();
    let mut body = FakeBody::new(&candidate_block("张三"));
    let mut set = full_set();
    set.id_back = None;

    let filled = insert_images(&cfg, &mut body, "张三", 1, 4, &set).unwrap();
    assert_eq!(filled, vec![Slot::IdFront, Slot::Diploma, Slot::Degree]);
    assert_eq!(body.paragraphs[2], "");
    assert!(!body.ops.iter().any(|op| matches!(op, Op::Text(2, _) | Op::Picture(2, ..))));
}

#[test]
fn extra_paragraphs_in_range_stay_cleared() {
    let cfg = Config::default();
    let mut body = FakeBody::new(&["张三", "身份证：", "", "毕业证：", "备注", "学位证："]);
    insert_images(&cfg, &mut body, "张三", 1, 5, &full_set()).unwrap();
    assert_eq!(body.paragraphs[5], "");
    assert_eq!(body.paragraphs[4], "学位证：\n\n");
}

#[test]
fn short_range_is_rejected_before_clearing() {
    let cfg = Config::default();
    let mut body = FakeBody::new(&["张三", "身份证：", "毕业证：", "学位证："]);
    let err = insert_images(&cfg, &mut body, "张三", 1, 3, &full_set()).unwrap_err();
    match err.downcast_ref::<FolderError>() {
        Some(FolderError::SlotCountMismatch { found, required, .. }) => {
            assert_eq!((*found, *required), (3, 4));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(body.ops.is_empty());
    assert_eq!(body.paragraphs[1], "身份证：");
}

#[test]
fn decomposed_text_matches_after_normalization() {
    let mut cfg = Config::default();
    cfg.document.start_marker = "Caf\u{e9}:".into();
    cfg.document.end_marker = "Fin:".into();
    // "e" followed by a combining acute accent, plus a compatibility
    // ideograph that normalizes to U+8C48.
    let body = FakeBody::new(&["\u{F900}", "Cafe\u{301}:", "", "", "Fin:"]);

    assert_eq!(next_anchor(&cfg, &body, "\u{8C48}", 0), Some(0));
    assert_eq!(scan_markers(&cfg, &body, 0), MarkerScan::Found { start: 1, end: 4 });

    cfg.matching.normalize_unicode = false;
    assert_eq!(next_anchor(&cfg, &body, "\u{8C48}", 0), None);
    assert_eq!(scan_markers(&cfg, &body, 0), MarkerScan::MissingStart);
}
