use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use folio::admin::{self, PostForm};
use folio::aggregate::{home_feed, Aggregator};
use folio::article::NormalizedArticle;
use folio::config::Config;
use folio::images::ImageStore;
use folio::storage::{BookPost, Database};
use folio::util::strip_control_chars;

/// Get the config directory path (~/.config/folio/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("folio"))
}

/// Create a directory with user-only permissions if it does not exist yet.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to set directory permissions to 0700"
            );
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "folio",
    about = "Book blog homepage: news feeds merged with your own posts"
)]
struct Cli {
    /// Config file (default: ~/.config/folio/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the homepage feed
    Home {
        /// Print articles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage book posts
    #[command(subcommand)]
    Posts(PostsCommand),
    /// Inspect static pages
    #[command(subcommand)]
    Pages(PagesCommand),
}

#[derive(Subcommand, Debug)]
enum PostsCommand {
    /// List all posts and pages
    List,
    /// Show one post by slug
    Show { slug: String },
    /// Create a book post
    New(PostArgs),
    /// Edit a post or page; omitted fields keep their current values
    Edit {
        id: i64,
        #[command(flatten)]
        fields: PostArgs,
    },
    /// Delete a post and its cover image
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum PagesCommand {
    /// List static pages
    List,
    /// Show a static page
    Show { slug: String },
}

#[derive(Args, Debug)]
struct PostArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    subtitle: Option<String>,
    /// Publication date, YYYY-MM-DD (new posts default to today)
    #[arg(long, value_name = "DATE")]
    date: Option<String>,
    #[arg(long, conflicts_with = "content_file")]
    content: Option<String>,
    /// Read the post body from a file
    #[arg(long, value_name = "FILE")]
    content_file: Option<PathBuf>,
    /// Cover image to upload
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
}

impl PostArgs {
    /// Builds a form, filling unset fields from `existing` when editing.
    fn into_form(self, existing: Option<&BookPost>) -> Result<PostForm> {
        let content = match &self.content_file {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read '{}'", path.display()))?,
            ),
            None => self.content,
        };

        let today = || Utc::now().format("%Y-%m-%d").to_string();
        Ok(PostForm {
            title: self
                .title
                .or_else(|| existing.map(|p| p.title.clone()))
                .unwrap_or_default(),
            subtitle: self
                .subtitle
                .or_else(|| existing.and_then(|p| p.subtitle.clone())),
            published_date: self
                .date
                .or_else(|| existing.map(|p| p.published_date.clone()))
                .unwrap_or_else(today),
            content: content.or_else(|| existing.and_then(|p| p.content.clone())),
            image: self.image,
        })
    }
}

struct AppContext {
    config: Config,
    db: Database,
    images: ImageStore,
}

async fn open_context(cli_config: Option<&Path>) -> Result<AppContext> {
    let config_dir = get_config_dir()?;
    let config_path = cli_config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let db_path = config.database_path(&config_dir);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_private_dir(parent)?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .with_context(|| format!("Failed to open database '{}'", db_path.display()))?;

    let images = ImageStore::new(config.image_dir(&config_dir), &config.image_base_url);

    Ok(AppContext { config, db, images })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = open_context(cli.config.as_deref()).await?;

    match cli.command {
        Command::Home { json } => {
            let aggregator =
                Aggregator::from_config(&ctx.config).context("Failed to build HTTP client")?;
            if aggregator.sources().is_empty() {
                tracing::warn!("No valid feed sources configured, showing posts only");
            }
            let articles = home_feed(&ctx.db, &aggregator, &ctx.config.site_label)
                .await
                .context("Failed to load posts for the homepage")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&articles)?);
            } else {
                print_articles(&articles);
            }
        }
        Command::Posts(cmd) => run_posts(&ctx, cmd).await?,
        Command::Pages(cmd) => match cmd {
            PagesCommand::List => {
                for page in ctx.db.list_pages().await? {
                    print_post_line(&page);
                }
            }
            PagesCommand::Show { slug } => {
                let page = admin::page(&ctx.db, &slug).await?;
                print_post(&page);
            }
        },
    }

    Ok(())
}

async fn run_posts(ctx: &AppContext, cmd: PostsCommand) -> Result<()> {
    match cmd {
        PostsCommand::List => {
            for post in ctx.db.find_all_posts().await? {
                print_post_line(&post);
            }
        }
        PostsCommand::Show { slug } => {
            let post = ctx
                .db
                .find_post_by_slug(&slug)
                .await?
                .with_context(|| format!("No post with slug '{slug}'"))?;
            print_post(&post);
        }
        PostsCommand::New(fields) => {
            let form = fields.into_form(None)?;
            let post = admin::create_post(&ctx.db, &ctx.images, &form).await?;
            println!("Created post {} ({})", post.id, post.slug);
        }
        PostsCommand::Edit { id, fields } => {
            let existing = ctx.db.find_post_by_id(id).await?;
            let form = fields.into_form(existing.as_ref())?;
            let post = admin::update_post(&ctx.db, &ctx.images, id, &form).await?;
            println!("Updated post {} ({})", post.id, post.slug);
        }
        PostsCommand::Delete { id } => {
            admin::delete_post(&ctx.db, &ctx.images, id).await?;
            println!("Deleted post {id}");
        }
    }
    Ok(())
}

fn print_articles(articles: &[NormalizedArticle]) {
    if articles.is_empty() {
        println!("No articles.");
        return;
    }

    // Feed text is untrusted; keep escape sequences out of the terminal
    let show = |value: Option<&str>| strip_control_chars(value.unwrap_or("-")).into_owned();
    for article in articles {
        println!(
            "{}  [{}]  {}",
            show(article.published_date.as_deref()),
            strip_control_chars(&article.publication_name),
            show(article.title.as_deref()),
        );
        if let Some(subtitle) = &article.subtitle {
            println!("    {}", strip_control_chars(subtitle));
        }
        if let Some(author) = &article.author {
            println!("    by {}", strip_control_chars(author));
        }
        println!("    {}", show(article.url.as_deref()));
    }
}

fn print_post_line(post: &BookPost) {
    println!(
        "{:>4}  {}  {:<5}  {}  ({})",
        post.id,
        post.published_date,
        post.kind.as_str(),
        post.title,
        post.slug
    );
}

fn print_post(post: &BookPost) {
    println!("{}", post.title);
    if let Some(subtitle) = &post.subtitle {
        println!("{subtitle}");
    }
    println!("{} | {} | /books/{}", post.published_date, post.kind, post.slug);
    if let Some(image) = &post.image_url {
        println!("Image: {image}");
    }
    println!();
    println!("{}", post.content.as_deref().unwrap_or(""));
}
