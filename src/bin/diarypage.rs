use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "diarypage", about = "Diary my-page summary CLI")]
struct Cli {
    /// Database path (default: ~/.diarypage/diarypage.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Record diaries
    Diary {
        #[command(subcommand)]
        action: DiaryAction,
    },
    /// Record AI comments
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Manage reward stamps
    Stamp {
        #[command(subcommand)]
        action: StampAction,
    },
    /// Show a user's my-page summary
    Summary {
        user_id: i64,
        /// Streak policy: gated or ungated (default: configured value)
        #[arg(long)]
        streak_policy: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the hour at which a user receives comments
    CommentTime {
        user_id: i64,
        /// Hour of day (0-23)
        hour: i32,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show row counts
    Status,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user
    Add {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
        /// Hour of day (0-23) for comments
        #[arg(long, default_value = "21")]
        comment_time: i32,
    },
    /// Show a user
    Show { user_id: i64 },
}

#[derive(Subcommand)]
enum DiaryAction {
    /// Write a diary
    Add {
        user_id: i64,
        #[arg(long, default_value = "")]
        content: String,
        /// Creation time (YYYY-MM-DD HH:MM:SS, default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum CommentAction {
    /// Store an AI comment for a user
    Add {
        user_id: i64,
        content: String,
        /// Emotion tag (repeatable)
        #[arg(long = "emotion")]
        emotions: Vec<String>,
        /// Creation time (YYYY-MM-DD HH:MM:SS, default: now)
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Subcommand)]
enum StampAction {
    /// Add a stamp to the catalogue
    Add {
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Give a stamp to a user
    Grant { user_id: i64, stamp_id: i64 },
    /// Equip one of the user's stamps
    Activate { user_id: i64, stamp_id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn parse_at(at: Option<&str>) -> anyhow::Result<chrono::NaiveDateTime> {
    match at {
        Some(s) => diarypage::date_util::parse_timestamp(s)
            .ok_or_else(|| diarypage::Error::InvalidTimestamp(s.to_string()).into()),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => diarypage::Database::open_at(path).await?,
        None => diarypage::Database::open().await?,
    };
    let app = diarypage::DiaryPage::new(db);

    match cli.command {
        Commands::User { action } => handle_user(&app, action).await?,
        Commands::Diary { action } => match action {
            DiaryAction::Add { user_id, content, at } => {
                let created_at = parse_at(at.as_deref())?;
                app.load_user(user_id).await?;
                let id = app.add_diary(user_id, &content, created_at).await?;
                println!("Diary {id} recorded for {}", created_at.date());
            }
        },
        Commands::Comment { action } => match action {
            CommentAction::Add {
                user_id,
                content,
                emotions,
                at,
            } => {
                let created_at = parse_at(at.as_deref())?;
                app.load_user(user_id).await?;
                let id = app.add_comment(user_id, &content, &emotions, created_at).await?;
                println!("Comment {id} stored.");
            }
        },
        Commands::Stamp { action } => handle_stamp(&app, action).await?,
        Commands::Summary {
            user_id,
            streak_policy,
            json,
        } => {
            let policy = streak_policy
                .as_deref()
                .map(str::parse::<diarypage::StreakPolicy>)
                .transpose()?;
            let user = app.load_user(user_id).await?;
            let summary = app.my_page(policy).await?.summary(&user).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::CommentTime { user_id, hour } => {
            let mut user = app.load_user(user_id).await?;
            app.my_page(None)
                .await?
                .update_comment_time(&mut user, hour)
                .await?;
            println!("Comment time for {} set to {hour}.", user.nickname);
        }
        Commands::Config { action } => handle_config(&app, action).await?,
        Commands::Status => {
            println!("Diary Page Status");
            for (table, count) in app.status().await? {
                println!("  {:<15} {count}", format!("{table}:"));
            }
        }
    }

    Ok(())
}

async fn handle_user(app: &diarypage::DiaryPage, action: UserAction) -> anyhow::Result<()> {
    match action {
        UserAction::Add {
            nickname,
            email,
            comment_time,
        } => {
            let now = chrono::Local::now().naive_local();
            let id = app.add_user(&nickname, &email, now, comment_time).await?;
            println!("Created user {id}");
        }
        UserAction::Show { user_id } => {
            let user = app.load_user(user_id).await?;
            println!("User {}", user.id);
            println!("  Nickname:     {}", user.nickname);
            println!("  Email:        {}", user.email);
            println!("  Joined:       {}", user.join_date());
            println!("  Comment time: {}", user.comment_time);
        }
    }
    Ok(())
}

async fn handle_stamp(app: &diarypage::DiaryPage, action: StampAction) -> anyhow::Result<()> {
    let shop = app.pointshop();
    match action {
        StampAction::Add { name, image } => {
            let id = shop.add_stamp(&name, image.as_deref()).await?;
            println!("Added stamp {id}");
        }
        StampAction::Grant { user_id, stamp_id } => {
            app.load_user(user_id).await?;
            shop.grant(user_id, stamp_id).await?;
            println!("Granted stamp {stamp_id} to user {user_id}");
        }
        StampAction::Activate { user_id, stamp_id } => {
            shop.activate(user_id, stamp_id).await?;
            println!("User {user_id} now shows stamp {stamp_id}");
        }
    }
    Ok(())
}

async fn handle_config(app: &diarypage::DiaryPage, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match app.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = app.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

fn print_summary(s: &diarypage::MyPageSummary) {
    println!("My Page: {} <{}>", s.nickname, s.email);
    println!("  Joined:        {}", s.join_date);
    println!("  Diary days:    {}", s.total_diary_count);
    println!("  Streak:        {} days", s.consecutive_diary_days);
    if s.main_emotions.is_empty() {
        println!("  Emotions:      -");
    } else {
        println!("  Emotions:      {}", s.main_emotions.join(" "));
    }
    println!("  AI comment:    {}", s.recent_ai_comment);
    println!("  Stamp:         {}", s.recent_stamp_image);
    println!("  Comment time:  {}:00", s.comment_time);
}
