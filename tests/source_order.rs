use assert_fs::TempDir;
use bit_attr::{AttrCheckFlags, AttrError, AttrValue};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

use common::{bare_attrs, open_attrs, options, options_with, worktree, write_file};

#[rstest]
fn index_only_ignores_working_tree_files(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c text\n");
    let attrs = open_attrs(&worktree);

    let opts = options_with(AttrCheckFlags::INDEX_ONLY);
    assert_eq!(attrs.get(&opts, "a.c", "text")?, AttrValue::Unspecified);

    // the default order still sees the working-tree file
    assert_eq!(attrs.get(&options(), "a.c", "text")?, AttrValue::True);

    Ok(())
}

#[rstest]
fn default_order_prefers_the_working_tree_copy(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c diff=worktree\n");
    let attrs = open_attrs(&worktree);
    attrs
        .repo()
        .stage_blob(".gitattributes", b"*.c diff=index\n");

    assert_eq!(
        attrs.get(&options(), "a.c", "diff")?,
        AttrValue::String("worktree".to_string())
    );

    Ok(())
}

#[rstest]
fn index_then_file_prefers_the_staged_copy(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c diff=worktree\n");
    let attrs = open_attrs(&worktree);
    attrs
        .repo()
        .stage_blob(".gitattributes", b"*.c diff=index\n");

    let opts = options_with(AttrCheckFlags::INDEX_THEN_FILE);
    assert_eq!(
        attrs.get(&opts, "a.c", "diff")?,
        AttrValue::String("index".to_string())
    );

    Ok(())
}

#[rstest]
fn index_blob_fills_in_when_the_working_file_is_gone(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let attrs = open_attrs(&worktree);
    attrs
        .repo()
        .stage_blob("src/.gitattributes", b"*.gen generated\n");

    assert_eq!(
        attrs.get(&options(), "src/a.gen", "generated")?,
        AttrValue::True
    );

    Ok(())
}

#[rstest]
fn head_blobs_rank_below_the_working_copy(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    write_file(&worktree, ".gitattributes", "*.c diff=worktree\n");
    let attrs = open_attrs(&worktree);
    let head = attrs
        .repo()
        .create_commit(&[(".gitattributes", b"*.c diff=head\n*.h diff=head\n")]);
    attrs.repo().set_head(Some(head));

    let opts = options_with(AttrCheckFlags::INCLUDE_HEAD);

    // the working copy wins where both speak; HEAD fills the gaps
    assert_eq!(
        attrs.get(&opts, "a.c", "diff")?,
        AttrValue::String("worktree".to_string())
    );
    assert_eq!(
        attrs.get(&opts, "a.h", "diff")?,
        AttrValue::String("head".to_string())
    );

    // without the flag, HEAD is not consulted at all
    assert_eq!(attrs.get(&options(), "a.h", "diff")?, AttrValue::Unspecified);

    Ok(())
}

#[rstest]
fn include_commit_consults_the_named_commit(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let attrs = open_attrs(&worktree);
    let old = attrs
        .repo()
        .create_commit(&[(".gitattributes", b"*.c diff=old\n")]);

    let opts = options_with(AttrCheckFlags::INCLUDE_COMMIT).with_commit(old);
    assert_eq!(
        attrs.get(&opts, "a.c", "diff")?,
        AttrValue::String("old".to_string())
    );

    Ok(())
}

#[rstest]
fn include_commit_without_a_commit_id_is_an_error(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let attrs = open_attrs(&worktree);

    let opts = options_with(AttrCheckFlags::INCLUDE_COMMIT);
    assert!(matches!(
        attrs.get(&opts, "a.c", "diff"),
        Err(AttrError::InvalidArgument(_))
    ));

    Ok(())
}

#[rstest]
fn bare_repositories_resolve_from_the_index(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let attrs = bare_attrs(&worktree);
    attrs.repo().stage_blob(".gitattributes", b"* text\n");
    attrs
        .repo()
        .stage_blob("src/.gitattributes", b"*.bin -text\n");

    assert_eq!(attrs.get(&options(), "src/x.bin", "text")?, AttrValue::False);
    assert_eq!(attrs.get(&options(), "src/x.c", "text")?, AttrValue::True);
    assert_eq!(attrs.get(&options(), "x.c", "text")?, AttrValue::True);

    Ok(())
}

#[rstest]
fn bare_repositories_resolve_from_head(
    worktree: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    let attrs = bare_attrs(&worktree);
    let head = attrs
        .repo()
        .create_commit(&[(".gitattributes", b"*.png binary-hint\n")]);
    attrs.repo().set_head(Some(head));

    let opts = options_with(AttrCheckFlags::INCLUDE_HEAD);
    assert_eq!(attrs.get(&opts, "a.png", "binary-hint")?, AttrValue::True);

    Ok(())
}
