//! Shell Renderer (C9): turns a [`QueryPlan`] into the `db.<collection>.<op>(...)`
//! text described in §6, using an extended-JSON pretty-printer for values.
//!
//! Long integers render as `{"$numberLong": "N"}`, dates as
//! `{"$date": <epochMillis>}`, and anything already shaped like
//! `{"$binary": ..., "$type": ...}` by the specialty recognizers (§4.2)
//! passes straight through — it is already plain strings by the time it
//! reaches here, not a native `Bson::Binary` value.

use bson::{Bson, Document};

use crate::config::RenderOptions;
use crate::plan::{Op, QueryPlan};

const INDENT: usize = 2;

/// Render `plan` to MongoDB shell syntax.
pub fn render(plan: &QueryPlan, options: &RenderOptions) -> String {
    match plan.op {
        Op::Find => render_find(plan),
        Op::Count => format!("db.{}.count({})", plan.collection, render_document(&plan.filter, 0)),
        Op::Distinct => render_distinct(plan),
        Op::Aggregate => render_aggregate(plan, options),
        Op::Delete => format!("db.{}.deleteMany({})", plan.collection, render_document(&plan.filter, 0)),
    }
}

fn render_find(plan: &QueryPlan) -> String {
    let mut call = if plan.projection.is_empty() {
        format!("db.{}.find({})", plan.collection, render_document(&plan.filter, 0))
    } else {
        format!(
            "db.{}.find({}, {})",
            plan.collection,
            render_document(&plan.filter, 0),
            render_document(&plan.projection, 0)
        )
    };

    if !plan.sort.is_empty() {
        call.push_str(&format!(".sort({})", render_document(&plan.sort, 0)));
    }
    if plan.offset >= 0 {
        call.push_str(&format!(".skip({})", render_number_long(plan.offset)));
    }
    if plan.limit >= 0 {
        call.push_str(&format!(".limit({})", render_number_long(plan.limit)));
    }
    call
}

fn render_distinct(plan: &QueryPlan) -> String {
    let field = plan
        .projection
        .keys()
        .next()
        .map(String::as_str)
        .unwrap_or("");
    format!(
        "db.{}.distinct(\"{}\", {})",
        plan.collection,
        field,
        render_document(&plan.filter, 0)
    )
}

fn render_aggregate(plan: &QueryPlan, options: &RenderOptions) -> String {
    let stages = build_pipeline(plan);
    let mut args = render_array(&stages, 0);

    if let Some(options_doc) = render_options_document(options) {
        args = format!("{}, {}", args, render_document(&options_doc, 0));
    }

    format!("db.{}.aggregate({})", plan.collection, args)
}

/// Assemble the pipeline stages in the order §4.5/§4.7 specify:
/// `$match` → joins → `$group` → `$sort` → `$skip` → `$limit` → `$project`.
fn build_pipeline(plan: &QueryPlan) -> Vec<Bson> {
    let mut stages = Vec::new();

    if !plan.filter.is_empty() {
        stages.push(stage("$match", plan.filter.clone()));
    }
    stages.extend(plan.join_pipeline.iter().cloned().map(Bson::Document));
    if !plan.group_bys.is_empty() || !plan.projection.is_empty() {
        stages.push(stage("$group", plan.projection.clone()));
    }
    if !plan.sort.is_empty() {
        stages.push(stage("$sort", plan.sort.clone()));
    }
    if plan.offset >= 0 {
        let mut doc = Document::new();
        doc.insert("$skip", Bson::Int64(plan.offset));
        stages.push(Bson::Document(doc));
    }
    if plan.limit >= 0 {
        let mut doc = Document::new();
        doc.insert("$limit", Bson::Int64(plan.limit));
        stages.push(Bson::Document(doc));
    }
    if !plan.alias_projection.is_empty() {
        stages.push(stage("$project", plan.alias_projection.clone()));
    }

    stages
}

fn stage(name: &str, body: Document) -> Bson {
    let mut doc = Document::new();
    doc.insert(name, Bson::Document(body));
    Bson::Document(doc)
}

fn render_options_document(options: &RenderOptions) -> Option<Document> {
    if options.aggregation_allow_disk_use.is_none() && options.aggregation_batch_size.is_none() {
        return None;
    }

    let mut doc = Document::new();
    if let Some(allow_disk_use) = options.aggregation_allow_disk_use {
        doc.insert("allowDiskUse", Bson::Boolean(allow_disk_use));
    }
    if let Some(batch_size) = options.aggregation_batch_size {
        let mut cursor = Document::new();
        cursor.insert("batchSize", Bson::Int32(batch_size as i32));
        doc.insert("cursor", Bson::Document(cursor));
    }
    Some(doc)
}

fn render_number_long(value: i64) -> String {
    render_value(&Bson::Int64(value), 0)
}

fn render_document(doc: &Document, indent_level: usize) -> String {
    if doc.is_empty() {
        return "{}".to_string();
    }

    let mut out = String::from("{\n");
    let inner_indent = " ".repeat((indent_level + 1) * INDENT);

    let entries: Vec<_> = doc.iter().collect();
    for (i, (key, value)) in entries.iter().enumerate() {
        out.push_str(&inner_indent);
        out.push('"');
        out.push_str(&escape_json_string(key));
        out.push_str("\": ");
        out.push_str(&render_value(value, indent_level + 1));
        if i < entries.len() - 1 {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str(&" ".repeat(indent_level * INDENT));
    out.push('}');
    out
}

fn render_array(arr: &[Bson], indent_level: usize) -> String {
    if arr.is_empty() {
        return "[]".to_string();
    }

    let mut out = String::from("[\n");
    let inner_indent = " ".repeat((indent_level + 1) * INDENT);

    for (i, value) in arr.iter().enumerate() {
        out.push_str(&inner_indent);
        out.push_str(&render_value(value, indent_level + 1));
        if i < arr.len() - 1 {
            out.push(',');
        }
        out.push('\n');
    }

    out.push_str(&" ".repeat(indent_level * INDENT));
    out.push(']');
    out
}

fn render_value(value: &Bson, indent_level: usize) -> String {
    match value {
        Bson::Document(doc) => render_document(doc, indent_level),
        Bson::Array(arr) => render_array(arr, indent_level),
        Bson::String(s) => format!("\"{}\"", escape_json_string(s)),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => {
            let mut wrapper = Document::new();
            wrapper.insert("$numberLong", Bson::String(n.to_string()));
            render_document(&wrapper, indent_level)
        }
        Bson::Double(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{:.1}", f)
            } else {
                f.to_string()
            }
        }
        Bson::Boolean(b) => b.to_string(),
        Bson::Null => "null".to_string(),
        Bson::DateTime(dt) => {
            let mut wrapper = Document::new();
            wrapper.insert("$date", Bson::Int64(dt.timestamp_millis()));
            render_document(&wrapper, indent_level)
        }
        Bson::ObjectId(oid) => {
            let mut wrapper = Document::new();
            wrapper.insert("$oid", Bson::String(oid.to_hex()));
            render_document(&wrapper, indent_level)
        }
        Bson::RegularExpression(regex) => {
            let mut wrapper = Document::new();
            wrapper.insert("$regex", Bson::String(regex.pattern.clone()));
            if !regex.options.is_empty() {
                wrapper.insert("$options", Bson::String(regex.options.clone()));
            }
            render_document(&wrapper, indent_level)
        }
        other => format!("\"{}\"", escape_json_string(&other.to_string())),
    }
}

fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
