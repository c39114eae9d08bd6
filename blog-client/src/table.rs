/// Table formatting for blog posts using comfy-table

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::client::BlogPost;

/// Longest content preview shown in a table cell, in characters
const CONTENT_PREVIEW: usize = 60;

/// Format a list of posts as a table with id, author, title and a content preview
pub fn format_posts_table(posts: &[BlogPost]) -> String {
    if posts.is_empty() {
        return "No blogs found".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("id"),
        Cell::new("author_id"),
        Cell::new("title"),
        Cell::new("content"),
    ]);

    for post in posts {
        table.add_row(vec![
            Cell::new(&post.id),
            Cell::new(&post.author_id),
            Cell::new(&post.title),
            Cell::new(preview(&post.content)),
        ]);
    }

    table.to_string()
}

fn preview(content: &str) -> String {
    if content.chars().count() <= CONTENT_PREVIEW {
        return content.to_string();
    }
    let cut: String = content.chars().take(CONTENT_PREVIEW).collect();
    format!("{}…", cut)
}
