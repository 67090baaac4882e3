use std::fmt;

use chrono::Utc;
use tracing::{info, warn};

pub mod client;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Freelancer, NewFreelancer, NewProject, Project, encode_milestones, encode_skills,
};
use client::{Connection, GatewayClient, Statement, Txn};

const FREELANCERS_PREFIX: &str = "freelancers";
const PROJECTS_PREFIX: &str = "projects";

/// Physical name of a logical table on the ledger: `<prefix>_<chain>_<id>`.
#[derive(Debug, Clone)]
pub struct TableRef {
    prefix: &'static str,
    chain_id: u64,
    table_id: u64,
}

impl TableRef {
    fn new(prefix: &'static str, chain_id: u64, table_id: u64) -> Self {
        Self {
            prefix,
            chain_id,
            table_id,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.prefix, self.chain_id, self.table_id)
    }
}

/// Data-access entry point over a signer-bound table-service connection.
///
/// Constructed once at startup and passed by reference to callers. Every
/// write is a ledger transaction: repository methods submit the statement,
/// then block on confirmation before returning, so a read issued after a
/// returned write observes it.
pub struct Database<C = GatewayClient> {
    conn: C,
    freelancers: TableRef,
    projects: TableRef,
}

impl Database<GatewayClient> {
    /// Create a new Database bound to the configured gateway and signer
    pub fn new(config: &Config) -> Self {
        Self::with_connection(GatewayClient::new(config), config)
    }
}

impl<C: Connection> Database<C> {
    /// Build a Database over any connection, for callers that construct
    /// their own transport.
    pub fn with_connection(conn: C, config: &Config) -> Self {
        Self {
            conn,
            freelancers: TableRef::new(
                FREELANCERS_PREFIX,
                config.chain_id,
                config.freelancers_table_id,
            ),
            projects: TableRef::new(PROJECTS_PREFIX, config.chain_id, config.projects_table_id),
        }
    }

    // Schema provisioning

    /// Create the freelancers table and wait for the create to confirm.
    ///
    /// Not idempotent: fails if the table already exists. Returns the
    /// physical table name minted by the service.
    pub async fn create_freelancers_table(&self) -> Result<String> {
        let statement = Statement::prepare(format!(
            "CREATE TABLE {FREELANCERS_PREFIX} (
                id integer primary key,
                wallet_address text,
                full_name text,
                email text,
                skills text,
                experience text,
                hourly_rate integer,
                portfolio text,
                bio text,
                timestamp integer
            );"
        ));
        let txn = self.conn.execute(&statement).await?;
        let receipt = self.conn.wait(&txn).await?;
        let name = match receipt.table_id {
            Some(table_id) => {
                TableRef::new(FREELANCERS_PREFIX, self.freelancers.chain_id, table_id).to_string()
            }
            None => self.freelancers.to_string(),
        };
        info!(table = %name, "freelancers table created");
        Ok(name)
    }

    /// Create the projects table and wait for the create to confirm.
    ///
    /// Not idempotent: fails if the table already exists. Returns the
    /// physical table name minted by the service.
    pub async fn create_projects_table(&self) -> Result<String> {
        let statement = Statement::prepare(format!(
            "CREATE TABLE {PROJECTS_PREFIX} (
                id integer primary key,
                client_address text,
                freelancer_address text,
                title text,
                description text,
                budget integer,
                timeline integer,
                milestones text,
                status text,
                timestamp integer
            );"
        ));
        let txn = self.conn.execute(&statement).await?;
        let receipt = self.conn.wait(&txn).await?;
        let name = match receipt.table_id {
            Some(table_id) => {
                TableRef::new(PROJECTS_PREFIX, self.projects.chain_id, table_id).to_string()
            }
            None => self.projects.to_string(),
        };
        info!(table = %name, "projects table created");
        Ok(name)
    }

    /// Idempotent check-then-create for both tables.
    ///
    /// Intended to run once at startup so later writes never hit the
    /// missing-table path at all.
    pub async fn ensure_schema(&self) -> Result<()> {
        if self.table_missing(&self.freelancers).await? {
            self.create_freelancers_table().await?;
        }
        if self.table_missing(&self.projects).await? {
            self.create_projects_table().await?;
        }
        Ok(())
    }

    async fn table_missing(&self, table: &TableRef) -> Result<bool> {
        let probe = Statement::prepare(format!("SELECT id FROM {table} LIMIT 1;"));
        match self.conn.query(&probe).await {
            Ok(_) => Ok(false),
            Err(Error::MissingTable(_)) => Ok(true),
            Err(err) => Err(err),
        }
    }

    // Freelancer operations

    /// Register a freelancer profile, waiting for the insert to confirm.
    ///
    /// The skills list is stored as one comma-joined column; the insert is
    /// rejected up front if any entry contains the delimiter. This path has
    /// no provisioning fallback: registering against a missing table fails.
    pub async fn register_freelancer(&self, freelancer: &NewFreelancer) -> Result<Txn> {
        let skills = encode_skills(&freelancer.skills)?;
        let statement = Statement::prepare(format!(
            "INSERT INTO {} (
                wallet_address,
                full_name,
                email,
                skills,
                experience,
                hourly_rate,
                portfolio,
                bio,
                timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?);",
            self.freelancers
        ))
        .bind(freelancer.wallet_address.as_str())
        .bind(freelancer.full_name.as_str())
        .bind(freelancer.email.as_str())
        .bind(skills)
        .bind(freelancer.experience.as_str())
        .bind(freelancer.hourly_rate)
        .bind(freelancer.portfolio.as_str())
        .bind(freelancer.bio.as_str())
        .bind(Utc::now().timestamp());
        let txn = self.conn.execute(&statement).await?;
        self.conn.wait(&txn).await?;
        Ok(txn)
    }

    /// Look up a freelancer by wallet address; `None` when unregistered.
    pub async fn freelancer_by_address(&self, wallet_address: &str) -> Result<Option<Freelancer>> {
        let statement = Statement::prepare(format!(
            "SELECT * FROM {} WHERE wallet_address = ?;",
            self.freelancers
        ))
        .bind(wallet_address);
        let rows = self.conn.query(&statement).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(row)?))
    }

    /// All registered freelancers, most recent first.
    pub async fn all_freelancers(&self) -> Result<Vec<Freelancer>> {
        let statement = Statement::prepare(format!(
            "SELECT * FROM {} ORDER BY timestamp DESC;",
            self.freelancers
        ));
        let rows = self.conn.query(&statement).await?;
        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }

    // Project operations

    /// Create a project, waiting for the insert to confirm.
    ///
    /// If the insert fails, the projects table is provisioned and the same
    /// insert retried exactly once. The retry deliberately fires on any
    /// failure, not just the missing-table case, matching the provisioning
    /// behavior callers already rely on.
    pub async fn create_project(&self, project: &NewProject) -> Result<Txn> {
        let milestones = encode_milestones(&project.milestones)?;
        let timestamp = Utc::now().timestamp();
        match self.insert_project(project, &milestones, timestamp).await {
            Ok(txn) => Ok(txn),
            Err(err) => {
                warn!(error = %err, "project insert failed, provisioning table and retrying");
                self.create_projects_table().await?;
                self.insert_project(project, &milestones, timestamp).await
            }
        }
    }

    async fn insert_project(
        &self,
        project: &NewProject,
        milestones: &str,
        timestamp: i64,
    ) -> Result<Txn> {
        let statement = Statement::prepare(format!(
            "INSERT INTO {} (
                client_address,
                freelancer_address,
                title,
                description,
                budget,
                timeline,
                milestones,
                status,
                timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?);",
            self.projects
        ))
        .bind(project.client_address.as_str())
        .bind(project.freelancer_address.as_str())
        .bind(project.title.as_str())
        .bind(project.description.as_str())
        .bind(project.budget)
        .bind(project.timeline)
        .bind(milestones)
        .bind(project.status.to_string())
        .bind(timestamp);
        let txn = self.conn.execute(&statement).await?;
        self.conn.wait(&txn).await?;
        Ok(txn)
    }

    /// Projects assigned to a freelancer, most recent first.
    ///
    /// The milestones column stays serialized; decode per project when
    /// needed.
    pub async fn projects_by_freelancer(&self, freelancer_address: &str) -> Result<Vec<Project>> {
        let statement = Statement::prepare(format!(
            "SELECT * FROM {} WHERE freelancer_address = ? ORDER BY timestamp DESC;",
            self.projects
        ))
        .bind(freelancer_address);
        let rows = self.conn.query(&statement).await?;
        rows.into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }

    /// Look up a project by id; `None` when no row matches.
    pub async fn project_by_id(&self, id: i64) -> Result<Option<Project>> {
        let statement =
            Statement::prepare(format!("SELECT * FROM {} WHERE id = ?;", self.projects)).bind(id);
        let rows = self.conn.query(&statement).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(row)?))
    }

    // Milestone state

    /// Mark the milestone at `index` completed and persist the whole list
    /// back in one write.
    ///
    /// The update carries the previously-read serialized list in its WHERE
    /// clause; if a concurrent writer changed the column in between, the
    /// overwrite matches no row and the verifying re-read reports
    /// [`Error::UpdateConflict`] so the caller can retry the whole
    /// read-modify-write cycle. A missing project is a no-op.
    pub async fn complete_milestone(&self, project_id: i64, index: usize) -> Result<()> {
        let Some(project) = self.project_by_id(project_id).await? else {
            return Ok(());
        };
        let previous = project.milestones.clone();
        let mut milestones = project.milestones()?;
        let len = milestones.len();
        let milestone = milestones
            .get_mut(index)
            .ok_or(Error::MilestoneIndex { index, len })?;
        milestone.completed = true;
        let updated = encode_milestones(&milestones)?;

        let statement = Statement::prepare(format!(
            "UPDATE {} SET milestones = ? WHERE id = ? AND milestones = ?;",
            self.projects
        ))
        .bind(updated.as_str())
        .bind(project_id)
        .bind(previous.as_str());
        let txn = self.conn.execute(&statement).await?;
        self.conn.wait(&txn).await?;

        // The receipt reports confirmation, not matched rows; re-read to
        // find out whether the guarded write actually landed.
        let Some(current) = self.project_by_id(project_id).await? else {
            return Err(Error::UpdateConflict);
        };
        let landed = current
            .milestones()?
            .get(index)
            .is_some_and(|milestone| milestone.completed);
        if !landed {
            return Err(Error::UpdateConflict);
        }
        Ok(())
    }
}

/// Initialize the database layer against the configured gateway
pub fn init(config: &Config) -> Database<GatewayClient> {
    let db = Database::new(config);

    // Call db.ensure_schema() here to provision both tables at startup
    // instead of relying on the create-time fallback.

    db
}
