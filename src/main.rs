use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gig_manager::config;
use gig_manager::db;
use gig_manager::models::{Milestone, NewFreelancer, NewProject, ProjectStatus};

#[derive(Parser)]
#[command(
    name = "gig-manager",
    about = "Freelance marketplace over a ledger-backed table service"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision any missing tables
    Setup,
    /// Register a freelancer profile
    Register {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Comma-separated list of skills
        #[arg(long)]
        skills: String,
        #[arg(long, default_value = "")]
        experience: String,
        #[arg(long)]
        rate: f64,
        #[arg(long, default_value = "")]
        portfolio: String,
        #[arg(long, default_value = "")]
        bio: String,
    },
    /// List all registered freelancers
    Freelancers,
    /// Show one freelancer profile
    Freelancer { wallet: String },
    /// Create a project with its milestone plan
    CreateProject {
        #[arg(long)]
        client: String,
        #[arg(long)]
        freelancer: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        budget: f64,
        /// Timeline in days
        #[arg(long)]
        timeline: i64,
        /// Milestone plan as JSON, e.g. '[{"name":"Design","amount":"100","completed":false}]'
        #[arg(long)]
        milestones: String,
        #[arg(long, default_value = "pending")]
        status: ProjectStatus,
    },
    /// List projects assigned to a freelancer
    Projects { freelancer: String },
    /// Show one project with its milestones
    Project { id: i64 },
    /// Mark a project milestone completed
    CompleteMilestone { id: i64, index: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration and bind the gateway connection
    let config = config::init()?;
    let db = db::init(&config);

    match cli.command {
        Command::Setup => {
            db.ensure_schema().await?;
            println!("tables ready");
        }
        Command::Register {
            wallet,
            name,
            email,
            skills,
            experience,
            rate,
            portfolio,
            bio,
        } => {
            let freelancer = NewFreelancer {
                wallet_address: wallet,
                full_name: name,
                email,
                skills: skills.split(',').map(|s| s.trim().to_string()).collect(),
                experience,
                hourly_rate: rate,
                portfolio,
                bio,
            };
            let txn = db.register_freelancer(&freelancer).await?;
            println!("registered in txn {}", txn.transaction_hash);
        }
        Command::Freelancers => {
            for freelancer in db.all_freelancers().await? {
                println!(
                    "{}  {}  [{}]  {}/hr",
                    freelancer.wallet_address,
                    freelancer.full_name,
                    freelancer.skills.join(", "),
                    freelancer.hourly_rate
                );
            }
        }
        Command::Freelancer { wallet } => match db.freelancer_by_address(&wallet).await? {
            Some(freelancer) => {
                println!("{} <{}>", freelancer.full_name, freelancer.email);
                println!("skills: {}", freelancer.skills.join(", "));
                println!("rate: {}/hr", freelancer.hourly_rate);
                println!("experience: {}", freelancer.experience);
                println!("portfolio: {}", freelancer.portfolio);
                println!("{}", freelancer.bio);
            }
            None => println!("no freelancer registered for {wallet}"),
        },
        Command::CreateProject {
            client,
            freelancer,
            title,
            description,
            budget,
            timeline,
            milestones,
            status,
        } => {
            let milestones: Vec<Milestone> = serde_json::from_str(&milestones)?;
            let project = NewProject {
                client_address: client,
                freelancer_address: freelancer,
                title,
                description,
                budget,
                timeline,
                milestones,
                status,
            };
            let txn = db.create_project(&project).await?;
            println!("project created in txn {}", txn.transaction_hash);
        }
        Command::Projects { freelancer } => {
            for project in db.projects_by_freelancer(&freelancer).await? {
                println!(
                    "#{}  {}  [{}]  budget {} over {} days",
                    project.id, project.title, project.status, project.budget, project.timeline
                );
            }
        }
        Command::Project { id } => match db.project_by_id(id).await? {
            Some(project) => {
                println!("#{}  {}  [{}]", project.id, project.title, project.status);
                println!("client: {}", project.client_address);
                println!("freelancer: {}", project.freelancer_address);
                println!("budget {} over {} days", project.budget, project.timeline);
                println!("{}", project.description);
                for (index, milestone) in project.milestones()?.iter().enumerate() {
                    let mark = if milestone.completed { "x" } else { " " };
                    println!("  [{mark}] {}: {} ({})", index, milestone.name, milestone.amount);
                }
            }
            None => println!("no project with id {id}"),
        },
        Command::CompleteMilestone { id, index } => {
            db.complete_milestone(id, index).await?;
            println!("milestone {index} completed on project {id}");
        }
    }

    Ok(())
}
