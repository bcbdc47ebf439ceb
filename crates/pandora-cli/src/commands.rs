use anyhow::{bail, Context};
use colored::Colorize;
use pandora_diff::{apply_updates, diff_slices, ItemIdentity, ListUpdate, ReplaySlot, UpdateLog};
use pandora_tree::{CollectionTree, TreeConfig};
use pandora_types::{ContentHash, Item};
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Command, DiffArgs, HashArgs, OutputFormat, TreeArgs};
use crate::config::CliConfig;
use crate::input::{load_groups, load_records, Record};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Diff(args) => cmd_diff(args, config, cli.format),
        Command::Tree(args) => cmd_tree(args, config, cli.format),
        Command::Hash(args) => cmd_hash(args, cli.format),
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Result of `pandora diff`.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub old_len: usize,
    pub new_len: usize,
    pub updates: Vec<ListUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// Result of `pandora tree`: what the root observer saw.
#[derive(Debug, Serialize)]
pub struct TreeReport {
    pub groups: usize,
    pub old_len: usize,
    pub new_len: usize,
    /// Start index of each group under the root, after the edit.
    pub group_starts: Vec<usize>,
    pub updates: Vec<ListUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

#[derive(Debug, Serialize)]
struct HashEntry<'a> {
    index: usize,
    hash: String,
    value: &'a serde_json::Value,
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn cmd_diff(args: DiffArgs, config: CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let key = args.compare.key.as_deref();
    let old = load_records(&args.old, args.lines, key)?;
    let new = load_records(&args.new, args.lines, key)?;
    let config = config.with_flags(&args.compare);

    let report = diff_report(&old, &new, config, args.compare.verify)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_updates(&report.updates);
            println!(
                "{} update(s): {} -> {} items",
                report.updates.len(),
                report.old_len,
                report.new_len
            );
            print_verified(report.verified);
        }
    }
    Ok(())
}

pub fn diff_report(
    old: &[Record],
    new: &[Record],
    config: CliConfig,
    verify: bool,
) -> anyhow::Result<DiffReport> {
    let updates = diff_slices(old, new, &ItemIdentity, config.diff).context("diff failed")?;
    debug!(updates = updates.len(), "edit script computed");

    if verify {
        verify_script(old, new, &updates)?;
    }
    Ok(DiffReport {
        old_len: old.len(),
        new_len: new.len(),
        updates,
        verified: verify.then_some(true),
    })
}

// ---------------------------------------------------------------------------
// tree
// ---------------------------------------------------------------------------

fn cmd_tree(args: TreeArgs, config: CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let key = args.compare.key.as_deref();
    let old = load_groups(&args.old, key)?;
    let new = load_groups(&args.new, key)?;
    let config = config.with_flags(&args.compare);

    let report = tree_report(old, new, config.tree_config(), args.compare.verify)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            print_updates(&report.updates);
            println!(
                "{} update(s) across {} group(s): {} -> {} items",
                report.updates.len(),
                report.groups,
                report.old_len,
                report.new_len
            );
            let starts: Vec<String> = report.group_starts.iter().map(usize::to_string).collect();
            println!("  group starts: [{}]", starts.join(", "));
            print_verified(report.verified);
        }
    }
    Ok(())
}

/// Build a root composite with one leaf per old group, observe the root,
/// then rewrite every group in one transaction.
///
/// Extra new groups become new leaves; missing ones are removed.
pub fn tree_report(
    old_groups: Vec<Vec<Record>>,
    new_groups: Vec<Vec<Record>>,
    config: TreeConfig,
    verify: bool,
) -> anyhow::Result<TreeReport> {
    let mut tree = CollectionTree::with_config(config);
    let root = tree.new_composite();
    let mut leaves = Vec::with_capacity(old_groups.len());
    for group in old_groups {
        let leaf = tree.new_leaf_with(group);
        tree.add_child(root, leaf)?;
        leaves.push(leaf);
    }

    let old_items = tree.items(root)?;
    let log = UpdateLog::new();
    tree.set_observer(root, log.clone())?;

    let groups = new_groups.len();
    tree.apply(root, |tree| {
        for (i, group) in new_groups.into_iter().enumerate() {
            match leaves.get(i) {
                Some(&leaf) => tree.set_all(leaf, group)?,
                None => {
                    let leaf = tree.new_leaf_with(group);
                    tree.add_child(root, leaf)?;
                }
            }
        }
        for &leaf in leaves.iter().skip(groups) {
            tree.remove_child(root, leaf)?;
        }
        Ok(())
    })?;

    let new_items = tree.items(root)?;
    let updates = log.take();
    debug!(node = %root, updates = updates.len(), "root notified");

    if verify {
        verify_script(&old_items, &new_items, &updates)?;
    }

    let group_starts = tree
        .children(root)?
        .iter()
        .map(|&child| tree.start_index(child))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TreeReport {
        groups,
        old_len: old_items.len(),
        new_len: new_items.len(),
        group_starts,
        updates,
        verified: verify.then_some(true),
    })
}

// ---------------------------------------------------------------------------
// hash
// ---------------------------------------------------------------------------

fn cmd_hash(args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let records = load_records(&args.input, args.lines, None)?;
    let entries: Vec<HashEntry<'_>> = records
        .iter()
        .enumerate()
        .map(|(index, r)| HashEntry {
            index,
            hash: format!("{:016x}", r.content_hash()),
            value: &r.value,
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            for e in &entries {
                println!("{:>5}  {}  {}", e.index, e.hash.dimmed(), e.value);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Replay `updates` onto `old` and check the result lines up with `new`.
///
/// Every kept slot must hold the same item as `new` at that position, and a
/// kept item whose content differs must have been marked changed.
pub fn verify_script<T: Item>(old: &[T], new: &[T], updates: &[ListUpdate]) -> anyhow::Result<()> {
    let slots = apply_updates(old, updates).context("replaying edit script")?;
    if slots.len() != new.len() {
        bail!(
            "replay produced {} items, expected {}",
            slots.len(),
            new.len()
        );
    }
    for (position, (slot, target)) in slots.iter().zip(new).enumerate() {
        if let ReplaySlot::Kept { item, changed } = slot {
            if !item.is_same_item(target) {
                bail!("replay put the wrong item at position {position}");
            }
            if !changed && item.content_hash() != target.content_hash() {
                bail!("content change at position {position} was not reported");
            }
        }
    }
    Ok(())
}

fn print_updates(updates: &[ListUpdate]) {
    if updates.is_empty() {
        println!("{}", "no changes".dimmed());
        return;
    }
    for update in updates {
        let line = update.to_string();
        let line = match update {
            ListUpdate::Inserted { .. } => format!("+ {line}").green(),
            ListUpdate::Removed { .. } => format!("- {line}").red(),
            ListUpdate::Moved { .. } => format!("~ {line}").yellow(),
            ListUpdate::Changed { .. } => format!("* {line}").cyan(),
        };
        println!("  {line}");
    }
}

fn print_verified(verified: Option<bool>) {
    if verified == Some(true) {
        println!("{} script replays to the new list", "✓".green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pandora_diff::DiffConfig;
    use serde_json::json;

    fn records(values: &[serde_json::Value], key: Option<&str>) -> Vec<Record> {
        values.iter().cloned().map(|v| Record::new(v, key)).collect()
    }

    fn strings(items: &[&str]) -> Vec<Record> {
        records(&items.iter().map(|s| json!(s)).collect::<Vec<_>>(), None)
    }

    #[test]
    fn diff_reports_move() {
        let old = strings(&["a", "b", "c"]);
        let new = strings(&["c", "a", "b"]);
        let report = diff_report(&old, &new, CliConfig::default(), true).unwrap();
        assert_eq!(report.updates, vec![ListUpdate::moved(2, 0)]);
        assert_eq!(report.verified, Some(true));
    }

    #[test]
    fn diff_without_moves() {
        let old = strings(&["a", "b", "c"]);
        let new = strings(&["c", "a", "b"]);
        let config = CliConfig {
            diff: DiffConfig::without_moves(),
            ..Default::default()
        };
        let report = diff_report(&old, &new, config, true).unwrap();
        assert_eq!(
            report.updates,
            vec![ListUpdate::removed(2, 1), ListUpdate::inserted(0, 1)]
        );
    }

    #[test]
    fn keyed_diff_reports_change() {
        let old = records(&[json!({"id": 1, "v": "x"}), json!({"id": 2, "v": "y"})], Some("id"));
        let new = records(&[json!({"id": 1, "v": "x"}), json!({"id": 2, "v": "z"})], Some("id"));
        let report = diff_report(&old, &new, CliConfig::default(), true).unwrap();
        assert_eq!(report.updates, vec![ListUpdate::changed(1, 1)]);

        let unkeyed_old = records(&[json!({"id": 2, "v": "y"})], None);
        let unkeyed_new = records(&[json!({"id": 2, "v": "z"})], None);
        let report = diff_report(&unkeyed_old, &unkeyed_new, CliConfig::default(), false).unwrap();
        assert_eq!(
            report.updates,
            vec![ListUpdate::removed(0, 1), ListUpdate::inserted(0, 1)]
        );
        assert_eq!(report.verified, None);
    }

    #[test]
    fn report_serializes_ops() {
        let report = diff_report(&strings(&[]), &strings(&["a", "b"]), CliConfig::default(), false)
            .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "old_len": 0,
                "new_len": 2,
                "updates": [{"op": "inserted", "position": 0, "count": 2}]
            })
        );
    }

    #[test]
    fn verify_rejects_bad_script() {
        let old = strings(&["a", "b"]);
        let new = strings(&["b", "a"]);
        let err = verify_script(&old, &new, &[]).unwrap_err();
        assert!(err.to_string().contains("wrong item at position 0"));
        let err = verify_script(&old, &strings(&["a"]), &[]).unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn verify_requires_change_marks() {
        let old = records(&[json!({"id": 1, "v": 1})], Some("id"));
        let new = records(&[json!({"id": 1, "v": 2})], Some("id"));
        assert!(verify_script(&old, &new, &[]).is_err());
        assert!(verify_script(&old, &new, &[ListUpdate::changed(0, 1)]).is_ok());
    }

    #[test]
    fn tree_rewrites_groups_in_one_batch() {
        let old = vec![strings(&["a", "b"]), strings(&["c"])];
        let new = vec![strings(&["a", "b", "x"]), strings(&["c"])];
        let report = tree_report(old, new, TreeConfig::default(), true).unwrap();
        assert_eq!(report.updates, vec![ListUpdate::inserted(2, 1)]);
        assert_eq!(report.group_starts, vec![0, 3]);
        assert_eq!((report.old_len, report.new_len), (3, 4));
    }

    #[test]
    fn tree_adds_and_drops_groups() {
        let old = vec![strings(&["a"]), strings(&["b"]), strings(&["c"])];
        let new = vec![strings(&["a"])];
        let report = tree_report(old, new, TreeConfig::default(), true).unwrap();
        assert_eq!(report.groups, 1);
        assert_eq!(report.updates, vec![ListUpdate::removed(1, 2)]);
        assert_eq!(report.group_starts, vec![0]);

        let old = vec![strings(&["a"])];
        let new = vec![strings(&["a"]), strings(&[]), strings(&["b", "c"])];
        let report = tree_report(old, new, TreeConfig::default(), true).unwrap();
        assert_eq!(report.updates, vec![ListUpdate::inserted(1, 2)]);
        assert_eq!(report.group_starts, vec![0, 1, 1]);
    }

    #[test]
    fn tree_move_across_groups() {
        let old = vec![strings(&["a", "b"]), strings(&["c"])];
        let new = vec![strings(&["b"]), strings(&["c", "a"])];
        let report = tree_report(old, new, TreeConfig::default(), true).unwrap();
        assert_eq!(report.updates, vec![ListUpdate::moved(0, 2)]);
    }
}
