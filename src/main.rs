use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;

use swapboard::api::{
    self, MarketplaceApi, NotificationAction, PaymentInitRequest, RemoteClient, SwapRequest,
};
use swapboard::catalog::Catalog;
use swapboard::config::Config;
use swapboard::draft::{DraftPatch, DraftStore, PostType};
use swapboard::logging::{self, LogMode};
use swapboard::rest::{self, ApiState};
use swapboard::submission::{CountdownOutcome, SubmissionError, SubmissionPipeline};
use swapboard::wizard::{DraftEvent, DraftLimits, Step, WizardSession};

#[derive(Parser)]
#[command(name = "swapboard")]
#[command(about = "Compose and publish marketplace posts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the stored draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,
    },

    /// Move through the wizard steps
    Step {
        #[command(subcommand)]
        action: StepAction,
    },

    /// Submit the stored draft
    Submit {
        post_type: PostType,

        /// Exit right after submitting instead of counting down to the redirect
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the most recently published post
    Latest,

    /// Browse categories and specification options
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// List subscription plans
    Plans,

    /// List published items and services
    Listings,

    /// Show how many posts the session user has published
    Status {
        /// Defaults to the session email
        #[arg(long)]
        email: Option<String>,
    },

    /// Start a plan payment
    Pay { plan_id: String },

    /// Check a payment by transaction reference
    Verify { tx_ref: String },

    /// Show the receipt of a payment
    Receipt { tx_ref: String },

    /// Swap and purchase notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationCommand,
    },

    /// Offer one of your posts in exchange for another
    Swap {
        /// Your post offered in the exchange
        #[arg(long)]
        offer: String,

        /// Post you want
        #[arg(long)]
        target: String,

        #[arg(long)]
        message: Option<String>,

        /// Cash added on top of the offered post
        #[arg(long)]
        cash: Option<f64>,
    },

    /// Show or write the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Start the local REST API
    Serve {
        /// Port to listen on (default: 7010)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the stored draft as JSON
    Show { post_type: PostType },
    /// Merge key=value pairs into the draft (`key=null` clears)
    Save {
        post_type: PostType,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Discard the draft
    Clear { post_type: PostType },
    /// Apply a JSON event, e.g. '{"type":"addImage","url":"a.png"}'
    Event { post_type: PostType, event: String },
}

#[derive(Subcommand)]
enum StepAction {
    /// Show progress and validation state of a step
    Show { post_type: PostType, step: Step },
    /// Apply edits, validate the step and advance
    Next {
        post_type: PostType,
        step: Step,
        fields: Vec<String>,
    },
    /// Go back one step without validating
    Previous { post_type: PostType, step: Step },
}

#[derive(Subcommand)]
enum CatalogAction {
    Categories {
        post_type: PostType,
    },
    Subcategories {
        post_type: PostType,
        category: String,
    },
    Specs {
        category: String,
        subcategory: String,
    },
    /// Options of a field; pass parent values as Brand=Apple
    Options {
        category: String,
        subcategory: String,
        field: String,
        selected: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the merged configuration as TOML
    Show,
    /// Write the merged configuration to .swapboard/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum NotificationCommand {
    List {
        #[arg(long)]
        email: Option<String>,
    },
    Accept {
        id: String,
    },
    Reject {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let mode = if matches!(cli.command, Commands::Serve { .. }) {
        LogMode::Server
    } else {
        LogMode::Cli
    };
    let logging_handle = logging::init_logging(&config, mode, cli.debug)?;

    match cli.command {
        Commands::Draft { action } => cmd_draft(&config, action)?,
        Commands::Step { action } => cmd_step(&config, action)?,
        Commands::Submit { post_type, no_wait } => cmd_submit(&config, post_type, no_wait).await?,
        Commands::Latest => cmd_latest(&config)?,
        Commands::Catalog { action } => cmd_catalog(action)?,
        Commands::Plans => cmd_plans(&config).await?,
        Commands::Listings => cmd_listings(&config).await?,
        Commands::Status { email } => cmd_status(&config, email).await?,
        Commands::Pay { plan_id } => cmd_pay(&config, plan_id).await?,
        Commands::Verify { tx_ref } => cmd_verify(&config, tx_ref).await?,
        Commands::Receipt { tx_ref } => cmd_receipt(&config, tx_ref).await?,
        Commands::Notifications { action } => cmd_notifications(&config, action).await?,
        Commands::Swap {
            offer,
            target,
            message,
            cash,
        } => cmd_swap(&config, offer, target, message, cash).await?,
        Commands::Config { action } => cmd_config(&config, action)?,
        Commands::Serve { port } => {
            if let Some(path) = &logging_handle.log_file_path {
                eprintln!("Logging to {}", path.display());
            }
            cmd_serve(config, port).await?;
        }
    }

    Ok(())
}

fn limits(config: &Config) -> DraftLimits {
    DraftLimits {
        max_images: config.drafts.max_images,
    }
}

fn client(config: &Config) -> Result<RemoteClient> {
    RemoteClient::from_config(config).context("Failed to create marketplace client")
}

fn session_email(config: &Config, email: Option<String>) -> Result<String> {
    match email.or_else(|| config.session.email.clone()) {
        Some(email) => Ok(email),
        None => bail!("No email given and no session email configured ([session] email)"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_patch(fields: &[String]) -> Result<DraftPatch> {
    DraftPatch::from_pairs(fields).map_err(anyhow::Error::msg)
}

fn cmd_draft(config: &Config, action: DraftAction) -> Result<()> {
    let store = DraftStore::from_config(config);

    match action {
        DraftAction::Show { post_type } => match store.get_draft(post_type) {
            Some(draft) => print_json(&draft)?,
            None => println!("No {} draft", post_type),
        },
        DraftAction::Save { post_type, fields } => {
            let patch = parse_patch(&fields)?;
            let mut session = WizardSession::open(store, post_type, limits(config));
            session.edit(&patch)?;
            match session.save_draft() {
                Some(draft) => print_json(&draft)?,
                None => eprintln!("Draft could not be saved; see log for details"),
            }
        }
        DraftAction::Clear { post_type } => {
            store.clear_draft(post_type);
            println!("Cleared {} draft", post_type);
        }
        DraftAction::Event { post_type, event } => {
            let event: DraftEvent =
                serde_json::from_str(&event).context("Event is not valid JSON")?;
            let mut session = WizardSession::open(store, post_type, limits(config));
            session.apply(&event)?;
            match session.save_draft() {
                Some(draft) => print_json(&draft)?,
                None => eprintln!("Draft could not be saved; see log for details"),
            }
        }
    }

    Ok(())
}

fn cmd_step(config: &Config, action: StepAction) -> Result<()> {
    let store = DraftStore::from_config(config);

    match action {
        StepAction::Show { post_type, step } => {
            let session = WizardSession::open_at(store, post_type, limits(config), step);
            println!("{}", session.progress().label);
            if session.step() == Step::Review {
                println!();
                print!("{}", session.review()?);
            }
            if let Err(errors) = session.validate() {
                println!();
                for error in &errors.errors {
                    println!("  ✗ {}", error);
                }
            }
        }
        StepAction::Next {
            post_type,
            step,
            fields,
        } => {
            let patch = parse_patch(&fields)?;
            let mut session = WizardSession::open_at(store, post_type, limits(config), step);
            session.edit(&patch)?;
            let outcome = session.next()?;
            println!("{}", outcome.progress.label);
        }
        StepAction::Previous { post_type, step } => {
            let mut session = WizardSession::open_at(store, post_type, limits(config), step);
            let outcome = session.previous();
            println!("{}", outcome.progress.label);
        }
    }

    Ok(())
}

async fn cmd_submit(config: &Config, post_type: PostType, no_wait: bool) -> Result<()> {
    let store = DraftStore::from_config(config);
    let pipeline = SubmissionPipeline::new(post_type, store, Arc::new(client(config)?), config);

    let redirect = match pipeline.submit().await {
        Ok(redirect) => redirect,
        Err(SubmissionError::Validation(errors)) => {
            eprintln!("The draft is incomplete:");
            for error in &errors.errors {
                eprintln!("  ✗ {}", error);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    println!("Post published! ({})", redirect.target);
    if no_wait {
        return Ok(());
    }

    let (countdown, canceller) = redirect.countdown();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let outcome = countdown
        .run(|remaining| println!("Redirecting in {}...", remaining))
        .await;
    match outcome {
        CountdownOutcome::Redirect(target) => println!("→ {}", target),
        CountdownOutcome::Cancelled => println!("Staying on the success page"),
    }

    Ok(())
}

fn cmd_latest(config: &Config) -> Result<()> {
    let store = DraftStore::from_config(config);
    match store.latest_post() {
        Some(preview) => {
            println!("{} ({})", preview.title, preview.post_type);
            println!("  id:        {}", preview.post_id);
            if let Some(image) = &preview.image {
                println!("  image:     {}", image);
            }
            println!("  published: {}", preview.published_at.to_rfc3339());
        }
        None => println!("No recently published post"),
    }
    Ok(())
}

fn cmd_catalog(action: CatalogAction) -> Result<()> {
    let catalog = Catalog::builtin();

    match action {
        CatalogAction::Categories { post_type } => {
            for option in catalog.categories(post_type) {
                println!("{:<20} {}", option.value, option.label);
            }
        }
        CatalogAction::Subcategories {
            post_type,
            category,
        } => {
            for option in catalog.get_subcategories(&category, post_type) {
                println!("{:<20} {}", option.value, option.label);
            }
        }
        CatalogAction::Specs {
            category,
            subcategory,
        } => {
            for field in catalog.specification_fields(&category, &subcategory) {
                match &field.depends_on {
                    Some(parent) => println!("{} (depends on {})", field.name, parent),
                    None => println!("{}: {}", field.name, field.options.join(", ")),
                }
            }
        }
        CatalogAction::Options {
            category,
            subcategory,
            field,
            selected,
        } => {
            let mut values = HashMap::new();
            for pair in &selected {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("expected Field=value, got '{}'", pair);
                };
                values.insert(key.to_string(), value.to_string());
            }
            for option in catalog.get_specification_options(&category, &subcategory, &field, &values)
            {
                println!("{}", option);
            }
        }
    }

    Ok(())
}

async fn cmd_plans(config: &Config) -> Result<()> {
    let client = client(config)?;
    for plan in api::plans_or_default(&client).await {
        let limit = plan
            .max_posts
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string());
        println!(
            "{:<10} {:<10} {:>8.2}  {} days, {} posts",
            plan.id, plan.name, plan.price, plan.duration_days, limit
        );
    }
    Ok(())
}

async fn cmd_listings(config: &Config) -> Result<()> {
    let client = client(config)?;
    let listings = match api::fetch_listings(&client).await {
        Ok(listings) => listings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch listings");
            bail!(e.user_message());
        }
    };

    println!("Items ({})", listings.items.len());
    for item in &listings.items {
        println!("  {} {}", item.id, item.title);
    }
    println!("Services ({})", listings.services.len());
    for service in &listings.services {
        println!("  {} {}", service.id, service.title);
    }
    Ok(())
}

async fn cmd_status(config: &Config, email: Option<String>) -> Result<()> {
    let email = session_email(config, email)?;
    let status = client(config)?.posts_status(&email).await?;
    println!("Posts published: {}", status.total_posts);
    if let Some(remaining) = status.remaining_posts {
        println!("Posts remaining: {}", remaining);
    }
    if let Some(plan) = &status.plan {
        println!("Plan:            {}", plan);
    }
    Ok(())
}

async fn cmd_pay(config: &Config, plan_id: String) -> Result<()> {
    let client = client(config)?;
    let email = session_email(config, None)?;
    let plans = api::plans_or_default(&client).await;
    let Some(plan) = plans.iter().find(|p| p.id == plan_id) else {
        bail!("Unknown plan '{}'", plan_id);
    };

    let name = config.session.display_name.clone().unwrap_or_default();
    let request = PaymentInitRequest::for_plan(plan, &email, &name);
    let response = client.initialize_payment(&request).await?;

    println!("Transaction: {}", response.tx_ref);
    if let Some(url) = &response.checkout_url {
        println!("Checkout:    {}", url);
    }
    Ok(())
}

async fn cmd_verify(config: &Config, tx_ref: String) -> Result<()> {
    let verification = client(config)?.verify_payment(&tx_ref).await?;
    if verification.is_paid() {
        println!("Payment {} confirmed", verification.tx_ref);
    } else {
        println!("Payment {} is {}", verification.tx_ref, verification.status);
    }
    Ok(())
}

async fn cmd_receipt(config: &Config, tx_ref: String) -> Result<()> {
    match client(config)?.receipt(&tx_ref).await {
        Ok(receipt) => print_json(&receipt),
        Err(e) if e.is_not_found() => {
            println!("No receipt found for {}", tx_ref);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_notifications(config: &Config, action: NotificationCommand) -> Result<()> {
    let client = client(config)?;

    match action {
        NotificationCommand::List { email } => {
            let email = session_email(config, email)?;
            let notifications = client.notifications(&email).await?;
            if notifications.is_empty() {
                println!("No notifications");
            }
            for n in notifications {
                let status = n.status.as_deref().unwrap_or("pending");
                println!("{} [{}] {}", n.id, status, n.message);
            }
        }
        NotificationCommand::Accept { id } => {
            client
                .respond_to_notification(&id, NotificationAction::Accept)
                .await?;
            println!("Accepted {}", id);
        }
        NotificationCommand::Reject { id } => {
            client
                .respond_to_notification(&id, NotificationAction::Reject)
                .await?;
            println!("Rejected {}", id);
        }
    }

    Ok(())
}

async fn cmd_swap(
    config: &Config,
    offer: String,
    target: String,
    message: Option<String>,
    cash: Option<f64>,
) -> Result<()> {
    let request = SwapRequest {
        requester_email: session_email(config, None)?,
        offered_post_id: offer,
        target_post_id: target,
        message,
        cash_top_up: cash,
    };
    client(config)?.send_swap_request(&request).await?;
    println!("Swap request sent");
    Ok(())
}

fn cmd_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::Init { force } => {
            let path = Config::local_config_path();
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            config.save_to(&path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

async fn cmd_serve(config: Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.rest_api.port);
    let state = ApiState::from_config(config).context("Failed to initialize REST API")?;

    println!("Starting REST API on port {}...", port);
    println!("  Health:  http://localhost:{}/api/v1/health", port);
    println!("  OpenAPI: http://localhost:{}/api-docs/openapi.json", port);

    rest::serve(state, port).await
}
