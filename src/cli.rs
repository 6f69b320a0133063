use crate::api::ShopClient;
use crate::auth::{FileTokenStore, TokenStore, role_of};
use crate::config::Config;
use crate::error::ShopError;
use crate::service::dashboard::purchase_alert;
use crate::service::{Dashboard, Session, SubmitOutcome};
use crate::types::{NewSweet, SearchQuery, SweetId};
use crate::view::{render_dashboard, render_sweet};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Terminal front end for the Sweet Shop.
#[derive(Debug, Parser)]
#[command(name = "sweetshop", version, about)]
pub struct Cli {
    /// Override the API base URL from configuration.
    #[arg(long, global = true)]
    pub api_url: Option<Url>,

    /// Override where the session token is kept.
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and keep the session token.
    Login {
        username: String,
        #[arg(long, env = "SWEETSHOP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create a customer account.
    Register {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, env = "SWEETSHOP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Defaults to the password when omitted.
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Forget the session token.
    Logout,
    /// Show the role of the stored session.
    Whoami,
    /// List the catalog.
    List,
    /// Filter the catalog.
    Search(SearchArgs),
    /// Show one item.
    Show { id: SweetId },
    /// Buy an item.
    Buy {
        id: SweetId,
        #[arg(long)]
        quantity: Option<u32>,
    },
    /// Add an item (admin).
    Add(SweetArgs),
    /// Replace an item (admin).
    Update {
        id: SweetId,
        #[command(flatten)]
        item: SweetArgs,
    },
    /// Add stock to an item (admin).
    Restock {
        id: SweetId,
        #[arg(long)]
        quantity: u32,
    },
    /// Remove an item (admin).
    Delete { id: SweetId },
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
}

impl From<SearchArgs> for SearchQuery {
    fn from(args: SearchArgs) -> Self {
        SearchQuery {
            name: args.name,
            category: args.category,
            min_price: args.min_price,
            max_price: args.max_price,
        }
    }
}

#[derive(Debug, Args)]
pub struct SweetArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub price: f64,
    #[arg(long)]
    pub quantity: i64,
    #[arg(long)]
    pub image_url: Option<String>,
}

impl From<SweetArgs> for NewSweet {
    fn from(args: SweetArgs) -> Self {
        NewSweet {
            name: args.name,
            category: args.category,
            price: args.price,
            quantity: args.quantity,
            image_url: args.image_url,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, mut cfg: Config) -> Config {
        if let Some(url) = self.api_url.clone() {
            cfg.api_url = url;
        }
        if let Some(path) = self.token_file.clone() {
            cfg.token_path = path;
        }
        cfg
    }
}

fn require_password(password: Option<String>) -> Result<String, ShopError> {
    password.filter(|p| !p.is_empty()).ok_or_else(|| {
        ShopError::InvalidInput("password required (--password or SWEETSHOP_PASSWORD)".into())
    })
}

fn whoami(store: &dyn TokenStore) -> Result<String, ShopError> {
    let line = match crate::service::session::stored_token(store)? {
        Some(token) => match role_of(&token) {
            Some(role) => format!("Logged in as {role}"),
            None => "Logged in (no role claim)".to_string(),
        },
        None => "Not logged in".to_string(),
    };
    Ok(line)
}

/// Execute one command. Output goes to stdout; diagnostics go through tracing.
pub async fn run(command: Command, cfg: &Config) -> Result<(), ShopError> {
    let client = ShopClient::new(cfg)?;
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(cfg.token_path.clone()));

    match command {
        Command::Login { username, password } => {
            let mut session = Session::new(client, store);
            let form = session.form_mut();
            form.username = username;
            form.password = require_password(password)?;
            match session.submit().await {
                Ok(SubmitOutcome::LoggedIn { role }) => {
                    let role = role.map(|r| r.to_string());
                    println!("Logged in as {}", role.as_deref().unwrap_or("user"));
                    Ok(())
                }
                Ok(SubmitOutcome::Registered(_)) => Ok(()),
                Err(e) => {
                    if let Some(msg) = session.form().error.as_deref() {
                        println!("{msg}");
                    }
                    Err(e)
                }
            }
        }
        Command::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            let mut session = Session::new(client, store);
            session.toggle_mode();
            let password = require_password(password)?;
            let form = session.form_mut();
            form.username = username;
            form.email = email.unwrap_or_default();
            form.confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            form.password = password;
            let result = session.submit().await;
            let form = session.form();
            if let Some(msg) = form.success.as_deref().or(form.error.as_deref()) {
                println!("{msg}");
            }
            result.map(|_| ())
        }
        Command::Logout => {
            Session::new(client, store).logout()?;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            println!("{}", whoami(store.as_ref())?);
            Ok(())
        }
        Command::List => {
            let mut dash = Dashboard::new(client, store)?;
            let result = dash.refresh().await;
            print!("{}", render_dashboard(dash.state()));
            result
        }
        Command::Search(args) => {
            let mut dash = Dashboard::new(client, store)?;
            let result = dash.search(&args.into()).await;
            print!("{}", render_dashboard(dash.state()));
            result
        }
        Command::Show { id } => {
            let dash = Dashboard::new(client, store)?;
            let sweet = dash.client().get_sweet(id).await?;
            println!("{}", render_sweet(&sweet, None));
            if let Some(url) = sweet.image_url.as_deref() {
                println!("image: {url}");
            }
            Ok(())
        }
        Command::Buy { id, quantity } => {
            let mut dash = Dashboard::new(client, store)?;
            match dash.purchase(id, quantity).await {
                Ok(receipt) => {
                    println!("Purchased! {} left in stock.", receipt.remaining_stock);
                    Ok(())
                }
                Err(e) => {
                    println!("{}", purchase_alert(&e));
                    Err(e)
                }
            }
        }
        Command::Add(item) => {
            let mut dash = Dashboard::new(client, store)?;
            let created = dash.create(&item.into()).await?;
            println!("Created {}", render_sweet(&created, None));
            Ok(())
        }
        Command::Update { id, item } => {
            let mut dash = Dashboard::new(client, store)?;
            let updated = dash.update(id, &item.into()).await?;
            println!("Updated {}", render_sweet(&updated, None));
            Ok(())
        }
        Command::Restock { id, quantity } => {
            let mut dash = Dashboard::new(client, store)?;
            let receipt = dash.restock(id, quantity).await?;
            println!("Restocked #{id}: {} in stock.", receipt.new_stock);
            Ok(())
        }
        Command::Delete { id } => {
            let mut dash = Dashboard::new(client, store)?;
            dash.delete(id).await?;
            println!("Deleted #{id}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_filters() {
        let cli = Cli::try_parse_from([
            "sweetshop",
            "search",
            "--category",
            "gummy",
            "--min-price",
            "2.5",
        ])
        .unwrap();
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        let query: SearchQuery = args.into();
        assert_eq!(query.category.as_deref(), Some("gummy"));
        assert_eq!(query.min_price, Some(2.5));
        assert_eq!(query.name, None);
    }

    #[test]
    fn global_overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "sweetshop",
            "list",
            "--api-url",
            "https://shop.example.com",
            "--token-file",
            "/tmp/tok",
        ])
        .unwrap();
        let cfg = cli.apply_overrides(Config::default());
        assert_eq!(cfg.api_url.as_str(), "https://shop.example.com/");
        assert_eq!(cfg.token_path, PathBuf::from("/tmp/tok"));
    }

    #[test]
    fn update_takes_flattened_item() {
        let cli = Cli::try_parse_from([
            "sweetshop", "update", "4", "--name", "Fudge", "--category", "Chocolate", "--price",
            "4.59", "--quantity", "50",
        ])
        .unwrap();
        let Command::Update { id, item } = cli.command else {
            panic!("expected update");
        };
        assert_eq!(id, 4);
        let item: NewSweet = item.into();
        assert_eq!(item.name, "Fudge");
        assert_eq!(item.image_url, None);
    }

    #[test]
    fn whoami_reports_the_stored_role() {
        use crate::auth::MemoryTokenStore;
        use crate::auth::claims::tests::make_token;

        let store = MemoryTokenStore::default();
        assert_eq!(whoami(&store).unwrap(), "Not logged in");

        store
            .save(&make_token(&serde_json::json!({ "sub": "a", "role": "admin" })))
            .unwrap();
        assert_eq!(whoami(&store).unwrap(), "Logged in as admin");

        store
            .save(&make_token(&serde_json::json!({ "sub": "a" })))
            .unwrap();
        assert_eq!(whoami(&store).unwrap(), "Logged in (no role claim)");

        store
            .save(&make_token(&serde_json::json!({ "role": "admin", "exp": 1_000 })))
            .unwrap();
        assert_eq!(whoami(&store).unwrap(), "Not logged in");
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(require_password(Some(String::new())).is_err());
        assert!(require_password(None).is_err());
        assert_eq!(require_password(Some("pw".into())).unwrap(), "pw");
    }
}
