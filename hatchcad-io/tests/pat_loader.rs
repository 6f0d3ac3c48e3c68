use std::f64::consts::FRAC_PI_4;
use std::io::Write;

use hatchcad_io::{IoError, load_pattern_file, parse_pat};

const SAMPLE: &str = r#"
;; acad-style excerpt
*ANSI31, ANSI Iron, Brick, Stone masonry
45, 0,0, 0,3.175
*BRICK,Brick or masonry-type surface
0, 0,0, 0,6.35
90, 0,0, 6.35,6.35, 6.35,-6.35
90, 6.35,0, 6.35,6.35, -6.35,6.35
*DOTS
0, 0,0, 0.79375,0.79375, 0,-0.79375
"#;

#[test]
fn parses_headers_families_and_dashes() {
    let patterns = parse_pat(SAMPLE).expect("parse sample");
    assert_eq!(patterns.len(), 3);

    let ansi31 = &patterns[0];
    assert_eq!(ansi31.name, "ANSI31");
    assert_eq!(
        ansi31.description.as_deref(),
        Some("ANSI Iron, Brick, Stone masonry")
    );
    assert_eq!(ansi31.families.len(), 1);
    assert!((ansi31.families[0].angle - FRAC_PI_4).abs() < 1e-12);
    assert!((ansi31.families[0].spacing - 3.175).abs() < 1e-12);
    assert!(ansi31.families[0].dashes.is_empty());

    let brick = &patterns[1];
    assert_eq!(brick.families.len(), 3);
    assert!((brick.families[2].origin.x() - 6.35).abs() < 1e-12);
    assert!((brick.families[2].shift - 6.35).abs() < 1e-12);
    assert_eq!(brick.families[2].dashes, vec![-6.35, 6.35]);

    let dots = &patterns[2];
    assert_eq!(dots.families[0].dashes, vec![0.0, -0.79375]);
    assert_eq!(dots.families[0].dash_period(), Some(0.79375));
}

#[test]
fn malformed_lines_report_their_line_number() {
    let err = parse_pat("*BAD\n45, 0, 0, 1\n").unwrap_err();
    match err {
        IoError::InvalidPattern { line, message } => {
            assert_eq!(line, 2);
            assert!(message.contains('5'));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = parse_pat("*BAD\n45, 0, zero, 0, 1\n").unwrap_err();
    assert!(matches!(err, IoError::InvalidPattern { line: 2, .. }));

    let err = parse_pat("*EMPTY\n*NEXT\n0,0,0,0,1\n").unwrap_err();
    assert!(matches!(err, IoError::InvalidPattern { line: 1, .. }));
}

#[test]
fn loads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    write!(file, "{SAMPLE}").expect("write sample");
    let patterns = load_pattern_file(file.path()).expect("load pattern file");
    assert_eq!(patterns.len(), 3);

    let missing = load_pattern_file(std::path::Path::new("/no/such/file.pat")).unwrap_err();
    assert!(matches!(missing, IoError::ReadError { .. }));
}
