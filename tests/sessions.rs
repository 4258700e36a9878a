use assert_fs::TempDir;
use bit_attr::{AttrError, AttrSession, AttrValue, CancellationToken};
use fake::Fake;
use fake::faker::lorem::en::Word;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::{open_attrs, options, worktree, write_file};

#[rstest]
fn session_lookups_agree_with_sessionless_lookups(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "* text\n*.bin -text\n");
    write_file(&worktree, "src/.gitattributes", "*.gen generated\n");
    let attrs = open_attrs(&worktree);
    let mut session = AttrSession::new();

    for _ in 0..3 {
        let name = Word().fake::<String>();
        for path in ["a.bin", "src/a.gen", &format!("src/{name}.c")] {
            assert_eq!(
                attrs.get_with_session(&mut session, &options(), path, "text")?,
                attrs.get(&options(), path, "text")?,
                "{path}"
            );
        }
    }

    Ok(())
}

#[rstest]
fn one_session_serves_many_paths_in_one_directory(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c diff=cpp\n");
    let attrs = open_attrs(&worktree);
    let mut session = AttrSession::new();

    for i in 0..32 {
        let path = format!("src/file{i}.c");
        assert_eq!(
            attrs.get_with_session(&mut session, &options(), &path, "diff")?,
            AttrValue::String("cpp".to_string())
        );
    }

    Ok(())
}

#[rstest]
fn session_get_many_and_foreach_are_consistent(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(
        &worktree,
        ".gitattributes",
        "[attr]binary -text -diff\n*.png binary\n*.c diff=cpp\n",
    );
    let attrs = open_attrs(&worktree);
    let mut session = AttrSession::new();

    let many =
        attrs.get_many_with_session(&mut session, &options(), "a.png", &["text", "binary"])?;
    assert_eq!(many, vec![AttrValue::False, AttrValue::True]);

    let mut reported = Vec::new();
    attrs.foreach_with_session(&mut session, &options(), "a.png", |name, value| {
        reported.push((name.to_string(), value.clone()));
        0
    })?;
    assert!(reported.contains(&("text".to_string(), AttrValue::False)));

    Ok(())
}

#[rstest]
fn cancelled_lookups_return_cancelled(worktree: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c text\n");
    let attrs = open_attrs(&worktree);

    let token = CancellationToken::new();
    token.cancel();
    let opts = options().with_cancel(token);

    assert!(matches!(
        attrs.get(&opts, "a.c", "text"),
        Err(AttrError::Cancelled)
    ));

    Ok(())
}

#[rstest]
fn cancellation_fires_mid_enumeration(worktree: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c a b c d\n*.c e f\n");
    let attrs = open_attrs(&worktree);

    let token = CancellationToken::new();
    let opts = options().with_cancel(token.clone());

    let result = attrs.foreach(&opts, "a.c", |_, _| {
        // cancel from inside the walk; the next between-rules check trips
        token.cancel();
        0
    });

    assert!(matches!(result, Err(AttrError::Cancelled)));

    Ok(())
}
