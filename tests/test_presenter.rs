use poemshelf::domain::PoemRecord;
use poemshelf::ports::PoemPresenter;

fn record(id: Option<i64>, title: &str, favorite: bool) -> PoemRecord {
    PoemRecord {
        id,
        title: title.to_string(),
        author: "李白".to_string(),
        dynasty: "唐".to_string(),
        content: "床前明月光，疑是地上霜。举头望明月，低头思故乡。".to_string(),
        appreciation: None,
        favorite,
        image: None,
    }
}

#[test]
fn given_no_poems_when_rendering_list_then_prints_placeholder() {
    // Arrange
    let presenter = PoemPresenter::new();

    // Act
    let output = presenter.render_list(&[]);

    // Assert
    assert_eq!(output, "No poems found.\n");
}

#[test]
fn given_favorite_and_plain_poem_when_rendering_list_then_marks_differ() {
    // Arrange
    let presenter = PoemPresenter::new();
    let poems = vec![record(Some(4), "登鹳雀楼", true), record(Some(1), "静夜思", false)];

    // Act
    let output = presenter.render_list(&poems);

    // Assert
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('★'));
    assert!(lines[0].contains("登鹳雀楼 · 李白 (唐)"));
    assert!(lines[1].starts_with('☆'));
}

#[test]
fn given_short_preview_width_when_rendering_list_then_content_is_cut_with_ellipsis() {
    let presenter = PoemPresenter::with_preview_chars(5);

    let output = presenter.render_list(&[record(Some(1), "静夜思", false)]);

    assert!(output.trim_end().ends_with("床前明月光…"));
}

#[test]
fn given_record_without_id_when_rendering_list_then_shows_dash() {
    let presenter = PoemPresenter::new();

    let output = presenter.render_list(&[record(None, "草稿", false)]);

    assert!(output.contains("   -  草稿"));
}

#[test]
fn given_appreciation_and_image_when_rendering_detail_then_both_appear() {
    // Arrange
    let presenter = PoemPresenter::new();
    let poem = PoemRecord {
        appreciation: Some("思乡之作。".to_string()),
        image: Some("https://img.example/jys.png".to_string()),
        ..record(Some(1), "静夜思", true)
    };

    // Act
    let output = presenter.render_detail(&poem);

    // Assert
    assert!(output.starts_with("★ 静夜思\n唐 · 李白\n\n床前明月光"));
    assert!(output.contains("\n赏析: 思乡之作。\n"));
    assert!(output.ends_with("\nimage: https://img.example/jys.png\n"));
}

#[test]
fn given_blank_appreciation_when_rendering_detail_then_section_omitted() {
    let presenter = PoemPresenter::default();
    let poem = PoemRecord {
        appreciation: Some("   ".to_string()),
        ..record(Some(1), "静夜思", false)
    };

    let output = presenter.render_detail(&poem);

    assert!(!output.contains("赏析"));
    assert!(!output.contains("image:"));
}
