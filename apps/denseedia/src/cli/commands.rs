//! # CLI Command Implementations
//!
//! Each command opens the store, runs one store operation (or one
//! transaction) and prints the result, as text or as JSON in `--json-mode`.

use super::LinkCommand;
use crate::api::{self, ElementJson, VersionJson};
use crate::config::Config;
use denseedia_core::{
    DenseError, Link, LinkId, LinkPatch, NewLink, NewNode, Node, NodeId, NodePatch, Store, Value,
    ValueKind, element, node,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Separator line between the sections of `show` and `history`.
const RULE: &str = "==========";

// =============================================================================
// HELPERS
// =============================================================================

/// Open the database, creating it if needed.
pub fn load_or_create_store(db_path: &Path) -> Result<Store, DenseError> {
    tracing::debug!(path = %db_path.display(), "opening database");
    Store::open_redb(db_path)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DenseError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| DenseError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn node_line(node: &Node) -> String {
    if node.kind.is_empty() {
        format!("Node {}: {}", node.id, node.title)
    } else {
        format!("Node {}: {} ({})", node.id, node.title, node.kind)
    }
}

fn label_of(link: &Link) -> &str {
    link.label.as_deref().unwrap_or("-")
}

/// Arrow of `link` as seen from `node`.
fn arrow(link: &Link, node: NodeId) -> &'static str {
    if !link.directed {
        "<=>"
    } else if link.to == node && link.from != node {
        "<=="
    } else {
        "==>"
    }
}

/// Validate the output path: its parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, DenseError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        DenseError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(DenseError::IoError(format!(
            "Output directory '{}' is not a directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| DenseError::IoError("Output path has no file name".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// NODE COMMANDS
// =============================================================================

/// Create a node plus its optional `url` and `comment` elements, atomically.
pub fn cmd_add(
    db_path: &Path,
    json_mode: bool,
    title: &[String],
    kind: Option<String>,
    url: Option<String>,
    comment: Option<String>,
) -> Result<(), DenseError> {
    let title = match (title.join(" "), &url) {
        (joined, _) if !joined.trim().is_empty() => joined,
        (_, Some(url)) => url.clone(),
        _ => {
            return Err(DenseError::InvalidInput(
                "a title is required (or a --url to use as title)".to_string(),
            ));
        }
    };
    let new = NewNode::new(title, kind.unwrap_or_default());

    let mut store = load_or_create_store(db_path)?;
    let created = store.write(|tx| {
        let created = node::create(tx, &new)?;
        if let Some(url) = url {
            element::create(tx, created.id, "url", &Value::String(url))?;
        }
        if let Some(comment) = comment {
            element::create(tx, created.id, "comment", &Value::String(comment))?;
        }
        Ok(created)
    })?;

    if json_mode {
        return print_json(&created);
    }
    println!("Created {}", node_line(&created));
    Ok(())
}

pub fn cmd_list(db_path: &Path, json_mode: bool) -> Result<(), DenseError> {
    let store = load_or_create_store(db_path)?;
    let nodes = store.list_nodes()?;
    if json_mode {
        return print_json(&nodes);
    }
    for n in &nodes {
        println!("{}", node_line(n));
    }
    Ok(())
}

/// Show a node, the current value of each element and its links.
pub fn cmd_show(db_path: &Path, json_mode: bool, id: u64) -> Result<(), DenseError> {
    let store = load_or_create_store(db_path)?;
    let details = store.details(NodeId(id))?;
    if json_mode {
        return print_json(&details);
    }

    println!("{}", node_line(&details.node));
    println!("{}", RULE);
    for summary in &details.elements {
        println!(
            "{:<10} = {} ({})",
            summary.name, summary.value, summary.kind
        );
    }
    println!("{}", RULE);
    for link in &details.links {
        let other_id = if link.from == details.node.id {
            link.to
        } else {
            link.from
        };
        let other = store.get_node(other_id)?;
        println!(
            "Link {} ({}) : {} {}",
            link.id,
            label_of(link),
            arrow(link, details.node.id),
            node_line(&other)
        );
    }
    Ok(())
}

pub fn cmd_edit(
    db_path: &Path,
    json_mode: bool,
    id: u64,
    title: Option<String>,
    kind: Option<String>,
) -> Result<(), DenseError> {
    if title.is_none() && kind.is_none() {
        return Err(DenseError::InvalidInput(
            "nothing to edit: pass --title and/or --kind".to_string(),
        ));
    }
    let mut store = load_or_create_store(db_path)?;
    let node = store.modify_node(NodeId(id), &NodePatch { title, kind })?;
    if json_mode {
        return print_json(&node);
    }
    println!("Updated {}", node_line(&node));
    Ok(())
}

/// Delete a node and everything it owns. Requires `--yes`.
pub fn cmd_delete(db_path: &Path, json_mode: bool, id: u64, yes: bool) -> Result<(), DenseError> {
    if !yes {
        return Err(DenseError::InvalidInput(format!(
            "deleting node {} removes all its history; pass --yes to confirm",
            id
        )));
    }
    let mut store = load_or_create_store(db_path)?;
    let deleted = store.delete_node(NodeId(id))?;
    if json_mode {
        return print_json(&api::DeletedNodeResponse::try_from(&deleted)?);
    }
    let versions: usize = deleted.elements.iter().map(|e| e.versions.len()).sum();
    println!(
        "Deleted {} ({} elements, {} versions, {} links)",
        node_line(&deleted.node),
        deleted.elements.len(),
        versions,
        deleted.links.len()
    );
    Ok(())
}

// =============================================================================
// ELEMENT COMMANDS
// =============================================================================

/// Record `text`, read as `value_type`, as the new value of `name`.
pub fn cmd_set(
    db_path: &Path,
    json_mode: bool,
    id: u64,
    name: &str,
    text: &str,
    value_type: &str,
    allow_type_change: bool,
) -> Result<(), DenseError> {
    let kind: ValueKind = value_type.parse()?;
    let value = Value::parse_as(kind, text)?;
    tracing::info!(%kind, %value, "value converted");

    let mut store = load_or_create_store(db_path)?;
    let version = store.set_value(NodeId(id), name, &value, allow_type_change)?;
    if json_mode {
        return print_json(&VersionJson::try_from(&version)?);
    }
    println!(
        "{} = {} ({}), version {}",
        name, value, version.kind, version.id
    );
    Ok(())
}

/// List every version of an element, oldest first.
pub fn cmd_history(db_path: &Path, json_mode: bool, id: u64, name: &str) -> Result<(), DenseError> {
    let store = load_or_create_store(db_path)?;
    let element = store.element_by_name(NodeId(id), name)?.ok_or_else(|| {
        DenseError::ElementNameNotFound {
            node: id,
            name: name.to_string(),
        }
    })?;
    let history = store.history(element.id)?;

    if json_mode {
        return print_json(&ElementJson::new(&element, &history)?);
    }
    println!("Element {}: {}", element.id, element.name);
    println!("{}", RULE);
    for version in &history {
        let marker = if version.current { "*" } else { " " };
        println!(
            "{} {} : {} ({})",
            marker, version.created_at, version.payload, version.kind
        );
    }
    Ok(())
}

// =============================================================================
// LINK COMMANDS
// =============================================================================

pub fn cmd_link(db_path: &Path, json_mode: bool, action: LinkCommand) -> Result<(), DenseError> {
    let mut store = load_or_create_store(db_path)?;
    match action {
        LinkCommand::Add {
            from,
            to,
            label,
            undirected,
        } => {
            let link = store.create_link(&NewLink {
                from: NodeId(from),
                to: NodeId(to),
                directed: !undirected,
                label,
            })?;
            if json_mode {
                return print_json(&link);
            }
            println!("Created link {}", link.id);
            Ok(())
        }
        LinkCommand::Show { id } => {
            let link = store.get_link(LinkId(id))?;
            if json_mode {
                return print_json(&link);
            }
            println!("Link {} ({})", link.id, label_of(&link));
            println!("{}", RULE);
            println!("{}", node_line(&store.get_node(link.from)?));
            println!("{}", if link.directed { "==>" } else { "<=>" });
            println!("{}", node_line(&store.get_node(link.to)?));
            Ok(())
        }
        LinkCommand::Edit {
            id,
            label,
            clear_label,
            directed,
        } => {
            let label = if clear_label { Some(None) } else { label.map(Some) };
            if label.is_none() && directed.is_none() {
                return Err(DenseError::InvalidInput(
                    "nothing to edit: pass --label, --clear-label or --directed".to_string(),
                ));
            }
            let link = store.modify_link(LinkId(id), &LinkPatch { directed, label })?;
            if json_mode {
                return print_json(&link);
            }
            println!("Updated link {} ({})", link.id, label_of(&link));
            Ok(())
        }
        LinkCommand::Delete { id } => {
            let link = store.delete_link(LinkId(id))?;
            if json_mode {
                return print_json(&link);
            }
            println!("Deleted link {}", link.id);
            Ok(())
        }
    }
}

// =============================================================================
// STORE COMMANDS
// =============================================================================

pub fn cmd_most_used(
    db_path: &Path,
    json_mode: bool,
    kind: &str,
    limit: usize,
) -> Result<(), DenseError> {
    let store = load_or_create_store(db_path)?;
    let counts = store.most_used_element_names(kind, limit)?;
    if json_mode {
        return print_json(&api::MostUsedResponse::new(kind.to_string(), counts));
    }
    for (name, count) in &counts {
        println!("{:>5}  {}", count, name);
    }
    Ok(())
}

pub fn cmd_status(db_path: &Path, json_mode: bool) -> Result<(), DenseError> {
    let store = load_or_create_store(db_path)?;
    let stats = store.stats()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "nodes": stats.nodes,
            "elements": stats.elements,
            "versions": stats.versions,
            "links": stats.links,
        });
        return print_json(&output);
    }

    println!("DenseEdia Status");
    println!("================");
    println!("Database: {}", db_path.display());
    println!();
    println!("Nodes:    {}", stats.nodes);
    println!("Elements: {}", stats.elements);
    println!("Versions: {}", stats.versions);
    println!("Links:    {}", stats.links);
    Ok(())
}

/// Write every table as pretty JSON to `output`.
pub fn cmd_export(db_path: &Path, output: &Path) -> Result<(), DenseError> {
    let validated_output = validate_output_path(output)?;
    let store = load_or_create_store(db_path)?;
    let snapshot = store.snapshot()?;

    let data = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| DenseError::SerializationError(e.to_string()))?;
    std::fs::write(&validated_output, &data)
        .map_err(|e| DenseError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported {} nodes, {} links ({} bytes) to {}",
        snapshot.nodes.len(),
        snapshot.links.len(),
        data.len(),
        validated_output.display()
    );
    Ok(())
}

/// Create an empty database; `--force` replaces an existing one.
pub fn cmd_init(db_path: &Path, force: bool) -> Result<(), DenseError> {
    if db_path.exists() {
        if !force {
            return Err(DenseError::InvalidInput(format!(
                "database '{}' already exists; use --force to overwrite",
                db_path.display()
            )));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| DenseError::IoError(format!("Remove old database: {}", e)))?;
        tracing::info!(path = %db_path.display(), "removed existing database");
    }
    load_or_create_store(db_path)?;
    println!("Initialized new database at {}", db_path.display());
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server on the configured address.
pub async fn cmd_server(config: &Config, ephemeral: bool, quiet: bool) -> Result<(), DenseError> {
    let store = if ephemeral {
        Store::in_memory()
    } else {
        load_or_create_store(&config.database)?
    };

    if !quiet {
        println!("DenseEdia v{}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("  Address:  http://{}:{}", config.server.host, config.server.port);
        if ephemeral {
            println!("  Database: (in memory)");
        } else {
            println!("  Database: {}", config.database.display());
        }
        println!(
            "  Auth:     {}",
            if config.server.api_key.is_some() {
                "bearer key"
            } else {
                "disabled"
            }
        );
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    api::run_server(store, &config.server).await
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db(dir: &TempDir) -> PathBuf {
        dir.path().join("test.redb")
    }

    #[test]
    fn add_creates_url_and_comment() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(
            &path,
            true,
            &["The".to_string(), "Hobbit".to_string()],
            Some("book".to_string()),
            Some("https://example.org".to_string()),
            Some("reread".to_string()),
        )
        .expect("add");

        let store = load_or_create_store(&path).expect("open");
        let nodes = store.list_nodes().expect("list");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "The Hobbit");
        let names: Vec<String> = store
            .summaries(nodes[0].id)
            .expect("summaries")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["url".to_string(), "comment".to_string()]);
    }

    #[test]
    fn add_without_title_uses_url() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(&path, true, &[], None, Some("https://a.test".to_string()), None).expect("add");
        let store = load_or_create_store(&path).expect("open");
        assert_eq!(
            store.get_node(NodeId(1)).expect("node").title,
            "https://a.test"
        );
    }

    #[test]
    fn add_needs_a_title() {
        let dir = TempDir::new().expect("temp dir");
        assert!(matches!(
            cmd_add(&db(&dir), true, &[], None, None, None),
            Err(DenseError::InvalidInput(_))
        ));
    }

    #[test]
    fn set_refuses_type_change_without_flag() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(&path, true, &["Dune".to_string()], None, None, None).expect("add");
        cmd_set(&path, true, 1, "rating", "5", "int", false).expect("int");

        let err = cmd_set(&path, true, 1, "rating", "4.5", "float", false).expect_err("refused");
        assert!(matches!(err, DenseError::ValueTypeChange { .. }));

        cmd_set(&path, true, 1, "rating", "4.5", "float", true).expect("override");
        let store = load_or_create_store(&path).expect("open");
        let element = store
            .element_by_name(NodeId(1), "rating")
            .expect("lookup")
            .expect("present");
        assert_eq!(store.history(element.id).expect("history").len(), 2);
    }

    #[test]
    fn history_of_unknown_name_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(&path, true, &["Dune".to_string()], None, None, None).expect("add");

        let err = cmd_history(&path, true, 1, "rating").expect_err("missing");
        assert!(matches!(
            err,
            DenseError::ElementNameNotFound { node: 1, ref name } if name == "rating"
        ));

        cmd_set(&path, true, 1, "rating", "5", "int", false).expect("set");
        cmd_history(&path, true, 1, "rating").expect("history");
    }

    #[test]
    fn delete_requires_confirmation() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(&path, true, &["x".to_string()], None, None, None).expect("add");
        assert!(cmd_delete(&path, true, 1, false).is_err());
        cmd_delete(&path, true, 1, true).expect("delete");
        let store = load_or_create_store(&path).expect("open");
        assert!(store.list_nodes().expect("list").is_empty());
    }

    #[test]
    fn init_refuses_existing_database() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_init(&path, false).expect("init");
        assert!(cmd_init(&path, false).is_err());
        cmd_init(&path, true).expect("force");
    }

    #[test]
    fn export_writes_snapshot() {
        let dir = TempDir::new().expect("temp dir");
        let path = db(&dir);
        cmd_add(&path, true, &["x".to_string()], None, None, None).expect("add");
        let out = dir.path().join("dump.json");
        cmd_export(&path, &out).expect("export");

        let text = std::fs::read_to_string(&out).expect("read");
        let json: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(json["nodes"][0]["title"], "x");
    }

    #[test]
    fn arrows_follow_direction() {
        let link = Link {
            id: LinkId(1),
            from: NodeId(1),
            to: NodeId(2),
            directed: true,
            label: None,
        };
        assert_eq!(arrow(&link, NodeId(1)), "==>");
        assert_eq!(arrow(&link, NodeId(2)), "<==");
        let undirected = Link {
            directed: false,
            ..link
        };
        assert_eq!(arrow(&undirected, NodeId(2)), "<=>");
    }
}
