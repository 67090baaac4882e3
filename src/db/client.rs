use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};

/// How long to sleep between receipt polls while a transaction is pending.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A SQL statement template with positional `?` placeholders and the values
/// bound to them.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn prepare(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Bind the next positional value.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Render the template into literal SQL by substituting each `?` with
    /// its bound value. The gateway only accepts fully-bound statements.
    pub fn render(&self) -> Result<String> {
        let placeholders = self.sql.matches('?').count();
        if placeholders != self.params.len() {
            return Err(Error::Statement(format!(
                "{} placeholders but {} bound values",
                placeholders,
                self.params.len()
            )));
        }

        let mut out = String::with_capacity(self.sql.len());
        let mut pieces = self.sql.split('?');
        let mut params = self.params.iter();
        if let Some(first) = pieces.next() {
            out.push_str(first);
        }
        for piece in pieces {
            if let Some(value) = params.next() {
                render_value(&mut out, value)?;
            }
            out.push_str(piece);
        }
        Ok(out)
    }
}

fn render_value(out: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Bool(b) => out.push(if *b { '1' } else { '0' }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('\'');
            out.push_str(&s.replace('\'', "''"));
            out.push('\'');
        }
        Value::Array(_) | Value::Object(_) => {
            return Err(Error::Statement(
                "composite values cannot be bound".to_string(),
            ));
        }
    }
    Ok(())
}

/// Handle to a submitted, not-yet-confirmed write transaction.
///
/// The write is only guaranteed visible to reads after
/// [`Connection::wait`] has returned for it.
#[derive(Debug, Clone, Deserialize)]
pub struct Txn {
    pub transaction_hash: String,
}

/// Ledger receipt for a confirmed transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Receipt {
    /// Table index minted by a CREATE TABLE transaction.
    #[serde(default)]
    pub table_id: Option<u64>,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Seam between the repositories and the remote table service.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a read statement and return the matching rows as JSON objects.
    async fn query(&self, statement: &Statement) -> Result<Vec<Value>>;

    /// Submit a write statement as a ledger transaction.
    async fn execute(&self, statement: &Statement) -> Result<Txn>;

    /// Block until the transaction is durably accepted by the ledger.
    async fn wait(&self, txn: &Txn) -> Result<Receipt>;
}

/// HTTP client for the SQL-over-ledger gateway, bound to one signer.
///
/// Reads hit the gateway's query endpoint directly; writes are relayed as
/// ledger transactions signed for the configured address and confirmed by
/// polling the receipt endpoint. Confirmation has no timeout: a transaction
/// that never mines blocks its caller.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    signer_address: String,
    chain_id: u64,
}

impl GatewayClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            signer_address: config.signer_address.clone(),
            chain_id: config.chain_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    message: String,
}

async fn error_from_response(res: reqwest::Response) -> Error {
    let status = res.status().as_u16();
    let message = match res.json::<GatewayErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => "unreadable gateway error body".to_string(),
    };
    match missing_table(&message) {
        Some(table) => Error::MissingTable(table),
        None => Error::Gateway { status, message },
    }
}

/// The gateway relays the backing engine's "no such table: <name>" message
/// verbatim; that phrasing is the only signal a table is unprovisioned.
fn missing_table(message: &str) -> Option<String> {
    let rest = message.split("no such table").nth(1)?;
    Some(rest.trim_start_matches([':', ' ']).to_string())
}

#[async_trait]
impl Connection for GatewayClient {
    async fn query(&self, statement: &Statement) -> Result<Vec<Value>> {
        let sql = statement.render()?;
        debug!(%sql, "query");
        let res = self
            .http
            .get(format!("{}/api/v1/query", self.base_url))
            .bearer_auth(&self.api_key)
            .query(&[("statement", sql.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        Ok(res.json().await?)
    }

    async fn execute(&self, statement: &Statement) -> Result<Txn> {
        let sql = statement.render()?;
        debug!(%sql, "execute");
        let res = self
            .http
            .post(format!("{}/api/v1/execute", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "chain_id": self.chain_id,
                "signer": self.signer_address,
                "statement": sql,
            }))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        Ok(res.json().await?)
    }

    async fn wait(&self, txn: &Txn) -> Result<Receipt> {
        let url = format!(
            "{}/api/v1/receipt/{}/{}",
            self.base_url, self.chain_id, txn.transaction_hash
        );
        loop {
            let res = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
            if res.status() == reqwest::StatusCode::NOT_FOUND {
                // Not mined yet.
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                continue;
            }
            if !res.status().is_success() {
                return Err(error_from_response(res).await);
            }
            let mut receipt: Receipt = res.json().await?;
            if let Some(message) = receipt.error.take() {
                return Err(Error::Txn {
                    hash: txn.transaction_hash.clone(),
                    message,
                });
            }
            return Ok(receipt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GatewayClient {
        GatewayClient::new(&Config {
            gateway_url: server.uri(),
            api_key: "test-key".to_string(),
            signer_address: "0x5167e4".to_string(),
            chain_id: 31337,
            freelancers_table_id: 1,
            projects_table_id: 2,
        })
    }

    #[test]
    fn render_substitutes_values_in_order() {
        let sql = Statement::prepare("INSERT INTO t (a, b, c, d) VALUES (?, ?, ?, ?);")
            .bind("plain")
            .bind(42)
            .bind(true)
            .bind(Value::Null)
            .render()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO t (a, b, c, d) VALUES ('plain', 42, 1, NULL);"
        );
    }

    #[test]
    fn render_escapes_embedded_quotes() {
        let sql = Statement::prepare("SELECT * FROM t WHERE name = ?;")
            .bind("O'Brien")
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE name = 'O''Brien';");
    }

    #[test]
    fn render_rejects_arity_mismatch() {
        let err = Statement::prepare("SELECT * FROM t WHERE id = ?;")
            .render()
            .unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }

    #[test]
    fn bound_question_marks_are_not_reinterpreted() {
        let sql = Statement::prepare("SELECT * FROM t WHERE note = ? AND id = ?;")
            .bind("really?")
            .bind(7)
            .render()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE note = 'really?' AND id = 7;");
    }

    #[tokio::test]
    async fn query_sends_rendered_statement_and_returns_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param(
                "statement",
                "SELECT * FROM projects_31337_2 WHERE id = 3;",
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": 3}])),
            )
            .mount(&server)
            .await;

        let statement =
            Statement::prepare("SELECT * FROM projects_31337_2 WHERE id = ?;").bind(3);
        let rows = client_for(&server).query(&statement).await.unwrap();
        assert_eq!(rows, vec![serde_json::json!({"id": 3})]);
    }

    #[tokio::test]
    async fn missing_table_responses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"message": "no such table: projects_31337_2"}),
            ))
            .mount(&server)
            .await;

        let statement = Statement::prepare("SELECT * FROM projects_31337_2;");
        let err = client_for(&server).query(&statement).await.unwrap_err();
        match err {
            Error::MissingTable(table) => assert_eq!(table, "projects_31337_2"),
            other => panic!("expected MissingTable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_then_wait_polls_until_the_receipt_lands() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/execute"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({"transaction_hash": "0xfeed"})),
            )
            .mount(&server)
            .await;
        // Pending on the first poll, mined on the second.
        Mock::given(method("GET"))
            .and(path("/api/v1/receipt/31337/0xfeed"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/receipt/31337/0xfeed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"block_number": 88, "table_id": 7})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let txn = client
            .execute(&Statement::prepare("CREATE TABLE projects (id integer primary key);"))
            .await
            .unwrap();
        assert_eq!(txn.transaction_hash, "0xfeed");
        let receipt = client.wait(&txn).await.unwrap();
        assert_eq!(receipt.block_number, Some(88));
        assert_eq!(receipt.table_id, Some(7));
    }

    #[tokio::test]
    async fn reverted_transactions_surface_the_ledger_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/receipt/31337/0xdead"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"error": "db query execution failed"})),
            )
            .mount(&server)
            .await;

        let txn = Txn {
            transaction_hash: "0xdead".to_string(),
        };
        let err = client_for(&server).wait(&txn).await.unwrap_err();
        match err {
            Error::Txn { hash, message } => {
                assert_eq!(hash, "0xdead");
                assert_eq!(message, "db query execution failed");
            }
            other => panic!("expected Txn, got {other:?}"),
        }
    }
}
