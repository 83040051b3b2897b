//! Cross-replica permission validation.
//!
//! Every tablet of a shard is compared against the shard's primary. All
//! fetches of one validation run concurrently; findings from every shard
//! are collected and reported together, ordered by shard and then by
//! tablet alias.

use std::collections::BTreeMap;
use std::fmt;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use shardgrid_tablet::{PermissionSnapshot, TabletManagerClient, TabletResult, diff_permissions};
use shardgrid_topo::{Tablet, TabletAlias};

use crate::error::{WranglerError, WranglerResult};
use crate::wrangler::Wrangler;

/// One problem found while validating a shard. Tablet findings are
/// displayed with the alias of the tablet they concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    pub keyspace: String,
    pub shard: String,
    /// Tablet the finding is about; `None` for shard-level findings.
    pub alias: Option<TabletAlias>,
    pub message: String,
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}/{} {}: {}", self.keyspace, self.shard, alias, self.message),
            None => write!(f, "{}/{}: {}", self.keyspace, self.shard, self.message),
        }
    }
}

/// Findings of a validation run. Empty means everything matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    findings: Vec<ValidationFinding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        keyspace: &str,
        shard: &str,
        alias: Option<&TabletAlias>,
        message: impl Into<String>,
    ) {
        self.findings.push(ValidationFinding {
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            alias: alias.cloned(),
            message: message.into(),
        });
    }

    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Order findings by shard, then tablet. Shard-level findings sort
    /// first; the order among findings for one tablet is preserved.
    fn sort(&mut self) {
        self.findings.sort_by(|a, b| {
            (&a.keyspace, &a.shard, &a.alias).cmp(&(&b.keyspace, &b.shard, &b.alias))
        });
    }

    fn into_result(mut self) -> WranglerResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.sort();
        Err(WranglerError::ValidationFailed(self))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, finding) in self.findings.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{finding}")?;
        }
        Ok(())
    }
}

/// Tablets of one shard, resolved before any fetch starts.
struct ShardPlan {
    keyspace: String,
    shard: String,
    primary: TabletAlias,
    tablets: Vec<Tablet>,
}

impl Wrangler {
    /// Fetch one tablet's grant tables, retrying while it is unreachable.
    pub async fn get_permissions(&self, alias: &TabletAlias) -> WranglerResult<PermissionSnapshot> {
        let tablet = self.ts().get_tablet(alias)?.tablet;
        let snapshot = fetch_with_retry(
            self.tmc().clone(),
            tablet,
            self.tablet_retry_attempts(),
            self.tablet_retry_delay(),
        )
        .await?;
        Ok(snapshot)
    }

    /// Check that every tablet of a shard has the primary's permissions.
    pub async fn validate_permissions_shard(&self, keyspace: &str, shard: &str) -> WranglerResult<()> {
        let mut report = ValidationReport::new();
        let plans = self.plan_shard(keyspace, shard, &mut report)?;
        self.run_validation(plans.into_iter().collect(), &mut report)
            .await;
        info!(%keyspace, %shard, findings = report.len(), "permissions validated");
        report.into_result()
    }

    /// Check every shard of a keyspace; see `validate_permissions_shard`.
    pub async fn validate_permissions_keyspace(&self, keyspace: &str) -> WranglerResult<()> {
        self.ts().get_keyspace(keyspace)?;
        let shards = self.ts().get_shard_names(keyspace)?;

        let mut report = ValidationReport::new();
        let mut plans = Vec::with_capacity(shards.len());
        for shard in &shards {
            plans.extend(self.plan_shard(keyspace, shard, &mut report)?);
        }
        self.run_validation(plans, &mut report).await;
        info!(%keyspace, shards = shards.len(), findings = report.len(), "permissions validated");
        report.into_result()
    }

    /// Resolve a shard's primary and tablets. Shards that can't be
    /// validated get a finding and no plan.
    fn plan_shard(
        &self,
        keyspace: &str,
        shard: &str,
        report: &mut ValidationReport,
    ) -> WranglerResult<Option<ShardPlan>> {
        let si = self.ts().get_shard(keyspace, shard)?;
        let Some(primary) = si.shard.primary_alias.clone() else {
            report.push(keyspace, shard, None, "no primary in shard record");
            return Ok(None);
        };

        let mut tablets: Vec<Tablet> = self
            .ts()
            .list_tablets(keyspace, shard)?
            .into_iter()
            .map(|info| info.tablet)
            .collect();
        if !tablets.iter().any(|t| t.alias == primary) {
            match self.ts().get_tablet(&primary) {
                Ok(info) => tablets.push(info.tablet),
                Err(e) if e.is_no_node() => {
                    report.push(
                        keyspace,
                        shard,
                        Some(&primary),
                        "primary is not registered",
                    );
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Some(ShardPlan {
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            primary,
            tablets,
        }))
    }

    async fn run_validation(&self, plans: Vec<ShardPlan>, report: &mut ValidationReport) {
        let tablets = plans.iter().flat_map(|p| p.tablets.iter().cloned()).collect();
        let mut snapshots = self.fetch_all(tablets).await;

        for plan in plans {
            let (keyspace, shard) = (plan.keyspace.as_str(), plan.shard.as_str());
            let reference = match snapshots.remove(&plan.primary) {
                Some(Ok(snapshot)) => snapshot,
                Some(Err(e)) => {
                    report.push(
                        keyspace,
                        shard,
                        Some(&plan.primary),
                        format!("primary is unreachable: {e}"),
                    );
                    continue;
                }
                None => {
                    report.push(
                        keyspace,
                        shard,
                        Some(&plan.primary),
                        "primary permission fetch did not complete",
                    );
                    continue;
                }
            };
            let primary_name = plan.primary.to_string();

            let mut others: Vec<&Tablet> = plan
                .tablets
                .iter()
                .filter(|t| t.alias != plan.primary)
                .collect();
            others.sort_by(|a, b| a.alias.cmp(&b.alias));

            for tablet in others {
                let alias = &tablet.alias;
                match snapshots.remove(alias) {
                    Some(Ok(snapshot)) => {
                        for diff in
                            diff_permissions(&primary_name, &reference, &alias.to_string(), &snapshot)
                        {
                            report.push(keyspace, shard, Some(alias), diff.message);
                        }
                    }
                    Some(Err(e)) if e.is_unreachable() => {
                        report.push(keyspace, shard, Some(alias), format!("tablet is unreachable: {e}"))
                    }
                    Some(Err(e)) => report.push(
                        keyspace,
                        shard,
                        Some(alias),
                        format!("failed to report permissions: {e}"),
                    ),
                    None => report.push(
                        keyspace,
                        shard,
                        Some(alias),
                        "permission fetch did not complete",
                    ),
                }
            }
        }
    }

    /// Fetch every tablet's snapshot concurrently.
    async fn fetch_all(
        &self,
        tablets: Vec<Tablet>,
    ) -> BTreeMap<TabletAlias, TabletResult<PermissionSnapshot>> {
        let mut tasks = JoinSet::new();
        for tablet in tablets {
            let tmc = self.tmc().clone();
            let attempts = self.tablet_retry_attempts();
            let delay = self.tablet_retry_delay();
            tasks.spawn(async move {
                let alias = tablet.alias.clone();
                (alias, fetch_with_retry(tmc, tablet, attempts, delay).await)
            });
        }

        let mut snapshots = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((alias, result)) => {
                    snapshots.insert(alias, result);
                }
                Err(e) => error!(error = %e, "permission fetch task failed"),
            }
        }
        snapshots
    }
}

/// Fetch a tablet's snapshot, retrying unreachable errors up to
/// `attempts` times with `delay` between tries. Other errors return
/// immediately.
async fn fetch_with_retry(
    tmc: TabletManagerClient,
    tablet: Tablet,
    attempts: u32,
    delay: std::time::Duration,
) -> TabletResult<PermissionSnapshot> {
    let mut attempt = 1;
    loop {
        match tmc.get_permissions(&tablet).await {
            Ok(snapshot) => {
                debug!(alias = %tablet.alias, attempt, "permissions fetched");
                return Ok(snapshot);
            }
            Err(e) if e.is_unreachable() && attempt < attempts => {
                warn!(alias = %tablet.alias, attempt, error = %e, "tablet unreachable, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_unreachable() {
                    warn!(alias = %tablet.alias, attempt, error = %e, "giving up on tablet");
                }
                return Err(e);
            }
        }
    }
}
