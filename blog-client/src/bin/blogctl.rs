/// Command line client for a Blogstone server

use anyhow::{Context, Result};
use blog_client::{table::format_posts_table, BlogClient, BlogPost};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blogctl")]
#[command(about = "Blogstone CLI", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "http://127.0.0.1:4040")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blog post
    Create {
        /// Author id
        #[arg(short, long)]
        author: String,
        /// Title
        #[arg(short, long)]
        title: String,
        /// Content
        #[arg(short, long, default_value = "")]
        content: String,
    },
    /// Read a blog post
    Read {
        /// Blog id (24 hex digits)
        id: String,
    },
    /// Replace author, title and content of a blog post
    Update {
        /// Blog id (24 hex digits)
        id: String,
        /// Author id
        #[arg(short, long)]
        author: String,
        /// Title
        #[arg(short, long)]
        title: String,
        /// Content
        #[arg(short, long, default_value = "")]
        content: String,
    },
    /// Delete a blog post
    Delete {
        /// Blog id (24 hex digits)
        id: String,
    },
    /// List every blog post
    List,
}

fn print_post(post: &BlogPost) {
    println!("{}", format_posts_table(std::slice::from_ref(post)));
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut client = BlogClient::connect(cli.server.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", cli.server))?;

    match cli.command {
        Commands::Create { author, title, content } => {
            let post = client.create_blog(author, title, content).await?;
            print_post(&post);
        }
        Commands::Read { id } => {
            let post = client.read_blog(&id).await?;
            print_post(&post);
        }
        Commands::Update { id, author, title, content } => {
            let post = BlogPost {
                id,
                author_id: author,
                title,
                content,
            };
            let updated = client.update_blog(&post).await?;
            print_post(&updated);
        }
        Commands::Delete { id } => {
            if client.delete_blog(&id).await? {
                println!("Deleted {}", id);
            }
        }
        Commands::List => {
            let mut stream = client.list_blogs_stream().await?;
            let mut posts = Vec::new();
            while let Some(post) = stream.next().await? {
                posts.push(post);
            }
            println!("{}", format_posts_table(&posts));
            println!("{} blog(s)", posts.len());
        }
    }

    Ok(())
}
