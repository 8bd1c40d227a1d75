use image::{Rgb, RgbImage};
use kdp_format::*;
use lopdf::Document;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str, shade: u8) {
    RgbImage::from_pixel(24, 36, Rgb([shade, 255 - shade, 128]))
        .save(dir.join(name))
        .unwrap();
}

fn write_garbage(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"definitely not an image").unwrap();
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Small page so resampling stays quick
fn small_options(out: &Path) -> BuildOptions {
    BuildOptions {
        output_name: "Book".to_string(),
        location: OutputLocation::Directory(out.to_path_buf()),
        page_size: PageSize::Custom {
            width_in: 1.0,
            height_in: 1.5,
        },
        bleed_mode: BleedMode::NoBleed,
        margins: Margins::uniform(0.1),
        ..BuildOptions::default()
    }
}

fn read_zip_entry(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

fn media_entries(path: &Path) -> usize {
    let file = std::fs::File::open(path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    archive
        .file_names()
        .filter(|name| name.starts_with("word/media/"))
        .count()
}

fn media_box(doc: &Document, page_id: lopdf::ObjectId) -> Vec<f32> {
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    page.get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect()
}

fn run_sync(
    folder: &Path,
    pages: &[String],
    options: &BuildOptions,
) -> (Result<BuildReport>, Vec<BuildProgress>) {
    let mut events = Vec::new();
    let result = build_document_sync(folder, pages, options, &mut |event: BuildProgress| {
        events.push(event)
    });
    (result, events)
}

fn states(events: &[BuildProgress]) -> Vec<BuildState> {
    events
        .iter()
        .filter_map(|event| match event {
            BuildProgress::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_three_page_build() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for (i, name) in ["1.png", "2.png", "3.png"].iter().enumerate() {
        write_image(src.path(), name, (i * 60) as u8);
    }

    let options = BuildOptions {
        output_name: "Book".to_string(),
        location: OutputLocation::Directory(out.path().to_path_buf()),
        page_size: PageSize::Template("6 x 9 in".to_string()),
        margins: Margins::uniform(0.5),
        bleed_mode: BleedMode::NoBleed,
        ..BuildOptions::default()
    };
    let geometry = options.geometry().unwrap();
    assert_eq!(geometry.printable_width_in(), 5.0);
    assert_eq!(geometry.printable_height_in(), 8.0);

    let pages = names(&["1.png", "2.png", "3.png"]);
    let report = build_document(src.path(), &pages, &options).await.unwrap();

    let docx_path = out.path().join("Book.docx");
    let pdf_path = out.path().join("Book.pdf");
    assert_eq!(report.pages_added, 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.output_path, docx_path);
    assert_eq!(report.docx_path.as_deref(), Some(docx_path.as_path()));
    assert_eq!(report.pdf_path.as_deref(), Some(pdf_path.as_path()));
    assert_eq!(report.message(), "Document saved as Book.docx");

    // DOCX: three pictures at printable size, mirrored margins
    let document = read_zip_entry(&docx_path, "word/document.xml");
    assert_eq!(document.matches("<pic:pic>").count(), 3);
    assert_eq!(document.matches("<w:pageBreakBefore/>").count(), 2);
    assert!(document.contains(r#"<wp:extent cx="4572000" cy="7315200"/>"#));
    assert!(document.contains(r#"<w:pgSz w:w="8640" w:h="12960"/>"#));
    assert!(document.contains(r#"w:top="720""#));
    assert_eq!(media_entries(&docx_path), 3);
    let settings = read_zip_entry(&docx_path, "word/settings.xml");
    assert!(settings.contains("<w:mirrorMargins/>"));

    // PDF: three full pages at 432 x 648 pt
    let doc = Document::load(&pdf_path).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 3);
    for (_, page_id) in pages {
        assert_eq!(media_box(&doc, page_id), vec![0.0, 0.0, 432.0, 648.0]);

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let content_id = page.get(b"Contents").unwrap().as_reference().unwrap();
        let content = doc.get_object(content_id).unwrap().as_stream().unwrap();
        let content = String::from_utf8(content.content.clone()).unwrap();
        assert!(content.contains("432 0 0 648 0 0 cm"));
        assert!(content.contains("/Im0 Do"));

        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(image.dict.get(b"Width").unwrap().as_i64().unwrap(), 1980);
        assert_eq!(image.dict.get(b"Height").unwrap().as_i64().unwrap(), 2970);
    }
}

#[test]
fn test_bleed_pages_fill_full_page() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let options = BuildOptions {
        bleed_mode: BleedMode::Bleed,
        margins: Margins::uniform(0.4),
        ..small_options(out.path())
    };
    let (result, _) = run_sync(src.path(), &names(&["1.png"]), &options);
    result.unwrap();

    // Printable area equals the page: 1 x 1.5 in
    let document = read_zip_entry(&out.path().join("Book.docx"), "word/document.xml");
    assert!(document.contains(r#"<wp:extent cx="914400" cy="1371600"/>"#));
    assert!(document.contains(r#"w:top="0""#));
}

#[test]
fn test_duplicated_page_is_rendered_twice() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    write_image(src.path(), "2.png", 90);

    let pages = names(&["1.png", "1.png", "2.png"]);
    let (result, _) = run_sync(src.path(), &pages, &small_options(out.path()));
    let report = result.unwrap();

    assert_eq!(report.pages_added, 3);
    let doc = Document::load(out.path().join("Book.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(media_entries(&out.path().join("Book.docx")), 3);
}

#[test]
fn test_state_transitions() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let (result, events) = run_sync(src.path(), &names(&["1.png"]), &small_options(out.path()));
    result.unwrap();

    assert_eq!(
        states(&events),
        vec![
            BuildState::Validating,
            BuildState::Rendering,
            BuildState::Finalizing,
            BuildState::Done
        ]
    );
    assert!(events.contains(&BuildProgress::PageStarted {
        index: 0,
        total: 1,
        filename: "1.png".to_string()
    }));
}

#[test]
fn test_empty_sequence_writes_nothing() {
    let src = tempfile::tempdir().unwrap();
    let parent = tempfile::tempdir().unwrap();
    let out = parent.path().join("out");

    let (result, events) = run_sync(src.path(), &[], &small_options(&out));

    assert!(matches!(result, Err(FormatError::NoPagesWarning)));
    assert_eq!(states(&events), vec![BuildState::Validating, BuildState::Idle]);
    assert!(!out.exists());
}

#[test]
fn test_missing_folder() {
    let parent = tempfile::tempdir().unwrap();
    let missing = parent.path().join("missing");
    let out = parent.path().join("out");

    let (result, events) = run_sync(&missing, &names(&["1.png"]), &small_options(&out));

    assert!(matches!(result, Err(FormatError::FolderNotFound(_))));
    assert_eq!(states(&events), vec![BuildState::Validating, BuildState::Idle]);
    assert!(!out.exists());
}

#[test]
fn test_invalid_geometry_rejected_before_rendering() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let options = BuildOptions {
        margins: Margins::uniform(0.8),
        ..small_options(out.path())
    };
    let (result, events) = run_sync(src.path(), &names(&["1.png"]), &options);

    assert!(matches!(result, Err(FormatError::InvalidGeometry(_))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, BuildProgress::PageStarted { .. })));
    assert!(!out.path().join("Book.docx").exists());
}

#[test]
fn test_unreadable_page_is_skipped() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    write_garbage(src.path(), "2.png");
    write_image(src.path(), "3.png", 200);

    let pages = names(&["1.png", "2.png", "3.png", "gone.png"]);
    let (result, events) = run_sync(src.path(), &pages, &small_options(out.path()));
    let report = result.unwrap();

    assert_eq!(report.pages_added, 2);
    let skipped: Vec<_> = report.skipped.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(skipped, vec!["2.png", "gone.png"]);
    assert_eq!(report.skipped[0].index, 1);

    let retries = events
        .iter()
        .filter(|e| matches!(e, BuildProgress::PageRetry { index: 1, .. }))
        .count();
    assert_eq!(retries, 2);

    // Both documents omit the skipped pages
    let doc = Document::load(out.path().join("Book.pdf")).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    let document = read_zip_entry(&out.path().join("Book.docx"), "word/document.xml");
    assert_eq!(document.matches("<pic:pic>").count(), 2);
}

#[test]
fn test_unreadable_page_aborts() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    write_garbage(src.path(), "2.png");

    let options = BuildOptions {
        failure_policy: PageFailurePolicy::Abort,
        ..small_options(out.path())
    };
    let (result, events) = run_sync(src.path(), &names(&["1.png", "2.png"]), &options);

    match result {
        Err(FormatError::ImageUnreadable { path, .. }) => {
            assert_eq!(path, src.path().join("2.png"))
        }
        other => panic!("Expected ImageUnreadable, got {other:?}"),
    }
    assert_eq!(states(&events).last(), Some(&BuildState::Failed));
    assert!(!out.path().join("Book.docx").exists());
    assert!(!out.path().join("Book.pdf").exists());
}

#[test]
fn test_no_valid_images_touches_nothing() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_garbage(src.path(), "1.png");
    std::fs::write(out.path().join("Book.pdf"), b"previous build").unwrap();

    let (result, events) = run_sync(src.path(), &names(&["1.png"]), &small_options(out.path()));

    assert!(matches!(result, Err(FormatError::NoValidImages)));
    assert_eq!(states(&events).last(), Some(&BuildState::Failed));
    assert_eq!(
        std::fs::read(out.path().join("Book.pdf")).unwrap(),
        b"previous build".to_vec()
    );
    assert!(!out.path().join("Book.docx").exists());
}

#[test]
fn test_undesired_output_removed() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    std::fs::write(out.path().join("Book.pdf"), b"stale").unwrap();

    let options = BuildOptions {
        output_kind: OutputKind::Docx,
        keep_pdf: false,
        ..small_options(out.path())
    };
    let (result, _) = run_sync(src.path(), &names(&["1.png"]), &options);
    let report = result.unwrap();

    assert!(report.pdf_path.is_none());
    assert!(!out.path().join("Book.pdf").exists());
    assert!(out.path().join("Book.docx").exists());
}

#[test]
fn test_pdf_only_build() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let options = BuildOptions {
        output_kind: OutputKind::Pdf,
        keep_docx: false,
        keep_pdf: false,
        ..small_options(out.path())
    };
    let (result, _) = run_sync(src.path(), &names(&["1.png"]), &options);
    let report = result.unwrap();

    assert_eq!(report.output_path, out.path().join("Book.pdf"));
    assert_eq!(report.message(), "Document saved as Book.pdf");
    assert!(report.docx_path.is_none());
    assert!(!out.path().join("Book.docx").exists());

    // Only the two documents end up in the destination, no staging files
    let entries: Vec<PathBuf> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries, vec![out.path().join("Book.pdf")]);
}

#[test]
fn test_previous_outputs_replaced() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    std::fs::write(out.path().join("Book.docx"), b"old docx").unwrap();
    std::fs::write(out.path().join("Book.pdf"), b"old pdf").unwrap();

    let (result, _) = run_sync(src.path(), &names(&["1.png"]), &small_options(out.path()));
    result.unwrap();

    let document = read_zip_entry(&out.path().join("Book.docx"), "word/document.xml");
    assert_eq!(document.matches("<pic:pic>").count(), 1);
    assert!(Document::load(out.path().join("Book.pdf")).is_ok());
}

#[test]
fn test_source_folder_destination() {
    let src = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let options = BuildOptions {
        location: OutputLocation::SourceFolder,
        ..small_options(Path::new("unused"))
    };
    let (result, _) = run_sync(src.path(), &names(&["1.png"]), &options);
    let report = result.unwrap();

    assert_eq!(report.output_path, src.path().join("Book.docx"));
    assert!(src.path().join("Book.pdf").exists());
}

#[test]
fn test_plan_build() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);

    let options = BuildOptions {
        page_size: PageSize::Template("6 x 9 in".to_string()),
        bleed_mode: BleedMode::Bleed,
        keep_pdf: false,
        ..small_options(out.path())
    };
    let plan = plan_build(src.path(), &names(&["1.png", "2.png"]), &options).unwrap();

    assert_eq!(plan.page_count, 2);
    assert_eq!(plan.missing_pages, names(&["2.png"]));
    assert_eq!(plan.page_width_in, 6.125);
    assert_eq!(plan.page_height_in, 9.25);
    assert_eq!(plan.printable_width_in, 6.125);
    assert_eq!((plan.target_width_px, plan.target_height_px), (2021, 3053));
    assert_eq!(plan.destination, out.path());
    assert_eq!(
        plan.outputs,
        vec![(OutputKind::Docx, out.path().join("Book.docx"))]
    );
    // Planning never writes
    assert!(!out.path().join("Book.docx").exists());

    assert!(matches!(
        plan_build(src.path(), &[], &options),
        Err(FormatError::NoPagesWarning)
    ));
}

#[tokio::test]
async fn test_progress_callback_from_async_build() {
    use std::sync::{Arc, Mutex};

    let src = tempfile::tempdir().unwrap();
    let out: TempDir = tempfile::tempdir().unwrap();
    write_image(src.path(), "1.png", 10);
    write_image(src.path(), "2.png", 20);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let report = build_document_with_progress(
        src.path(),
        &names(&["1.png", "2.png"]),
        &small_options(out.path()),
        move |event| sink.lock().unwrap().push(event),
    )
    .await
    .unwrap();

    assert_eq!(report.pages_added, 2);
    let events = events.lock().unwrap();
    let started = events
        .iter()
        .filter(|e| matches!(e, BuildProgress::PageStarted { .. }))
        .count();
    assert_eq!(started, 2);
    assert_eq!(states(&events).last(), Some(&BuildState::Done));
}
