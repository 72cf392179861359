//! Domain search: one aggregate query over the web artifact tables.
//!
//! Each row of the aggregate is one (lower-cased domain, data source) pair
//! with its activity window, page view and download counts, and the known
//! account types seen for it. Page views and downloads are also counted
//! inside a recent window ending at the case's latest web activity.

use discovery_core::{ArtifactType, AttributeKind};

use crate::context::SearchEnv;
use crate::error::DiscoveryResult;
use crate::filters::FilterRef;
use crate::results::{DomainResult, SearchResult};
use crate::store::{StoreResult, StoreRow};

const SECONDS_PER_DAY: i64 = 86_400;

fn id_list<I: IntoIterator<Item = i32>>(ids: I) -> String {
    ids.into_iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(",")
}

fn domain_type_ids() -> String {
    id_list(ArtifactType::DOMAIN_TYPES.iter().map(|t| t.type_id()))
}

fn date_kind_ids() -> String {
    id_list(AttributeKind::DATE_KINDS.iter().map(|k| k.type_id()))
}

/// Query for the most recent activity timestamp across every web artifact.
#[must_use]
pub fn latest_activity_query() -> String {
    format!(
        "MAX(blackboard_attributes.value_int64) AS latest_activity \
         FROM blackboard_attributes \
         INNER JOIN blackboard_artifacts ON blackboard_artifacts.artifact_id = blackboard_attributes.artifact_id \
         WHERE blackboard_artifacts.artifact_type_id IN ({}) \
         AND blackboard_attributes.attribute_type_id IN ({})",
        domain_type_ids(),
        date_kind_ids(),
    )
}

/// The aggregate domain query. Activity at or after `recent_cutoff` (epoch
/// seconds) counts towards the recent-window columns.
#[must_use]
pub fn domain_aggregate_query(filters: &[FilterRef], recent_cutoff: i64) -> String {
    let mut artifact_types: Vec<i32> = ArtifactType::DOMAIN_TYPES.iter().map(|t| t.type_id()).collect();
    artifact_types.push(ArtifactType::WebAccountType.type_id());

    let mut where_parts = vec![format!(
        "blackboard_artifacts.artifact_type_id IN ({})",
        id_list(artifact_types)
    )];
    where_parts.extend(
        filters
            .iter()
            .map(|f| f.domain_where_clause())
            .filter(|clause| !clause.trim().is_empty())
            .map(|clause| format!("({clause})")),
    );
    let having: Vec<String> = filters
        .iter()
        .filter_map(|f| f.domain_having_clause())
        .map(|clause| format!("({clause})"))
        .collect();
    let having = if having.is_empty() {
        String::new()
    } else {
        format!(" HAVING {}", having.join(" AND "))
    };

    let domain_kind = AttributeKind::Domain.type_id();
    let text_kind = AttributeKind::Text.type_id();
    let history = ArtifactType::WebHistory.type_id();
    let download = ArtifactType::WebDownload.type_id();
    let account = ArtifactType::WebAccountType.type_id();

    format!(
        "activity.domain AS domain, \
         activity.data_source_obj_id AS data_source_obj_id, \
         MIN(activity.activity_date) AS activity_start, \
         MAX(activity.activity_date) AS activity_end, \
         SUM(activity.is_page_view) AS total_page_views, \
         SUM(CASE WHEN activity.activity_date >= {recent_cutoff} THEN activity.is_page_view ELSE 0 END) AS page_views_in_recent_window, \
         SUM(activity.is_download) AS files_downloaded, \
         SUM(CASE WHEN activity.activity_date >= {recent_cutoff} THEN activity.is_download ELSE 0 END) AS files_downloaded_in_recent_window, \
         MAX(accounts.account_type_count) AS count_of_known_account_types, \
         MAX(accounts.account_types) AS account_types \
         FROM (\
           SELECT blackboard_artifacts.artifact_id, blackboard_artifacts.data_source_obj_id, \
           MAX(CASE WHEN blackboard_attributes.attribute_type_id = {domain_kind} THEN LOWER(blackboard_attributes.value_text) END) AS domain, \
           MAX(CASE WHEN blackboard_attributes.attribute_type_id IN ({dates}) THEN blackboard_attributes.value_int64 END) AS activity_date, \
           MAX(CASE WHEN blackboard_artifacts.artifact_type_id = {history} THEN 1 ELSE 0 END) AS is_page_view, \
           MAX(CASE WHEN blackboard_artifacts.artifact_type_id = {download} THEN 1 ELSE 0 END) AS is_download \
           FROM blackboard_artifacts \
           INNER JOIN blackboard_attributes ON blackboard_artifacts.artifact_id = blackboard_attributes.artifact_id \
           WHERE {where_clause} \
           GROUP BY blackboard_artifacts.artifact_id, blackboard_artifacts.data_source_obj_id\
         ) AS activity \
         LEFT JOIN (\
           SELECT LOWER(domain_attr.value_text) AS domain, blackboard_artifacts.data_source_obj_id, \
           COUNT(DISTINCT type_attr.value_text) AS account_type_count, \
           GROUP_CONCAT(DISTINCT type_attr.value_text) AS account_types \
           FROM blackboard_artifacts \
           INNER JOIN blackboard_attributes AS domain_attr ON domain_attr.artifact_id = blackboard_artifacts.artifact_id AND domain_attr.attribute_type_id = {domain_kind} \
           INNER JOIN blackboard_attributes AS type_attr ON type_attr.artifact_id = blackboard_artifacts.artifact_id AND type_attr.attribute_type_id = {text_kind} \
           WHERE blackboard_artifacts.artifact_type_id = {account} \
           GROUP BY LOWER(domain_attr.value_text), blackboard_artifacts.data_source_obj_id\
         ) AS accounts \
         ON accounts.domain = activity.domain AND accounts.data_source_obj_id = activity.data_source_obj_id \
         WHERE activity.domain IS NOT NULL \
         GROUP BY activity.domain, activity.data_source_obj_id{having}",
        dates = date_kind_ids(),
        where_clause = where_parts.join(" AND "),
    )
}

fn non_negative(row: &StoreRow, column: &str) -> StoreResult<u64> {
    Ok(u64::try_from(row.get_i64(column)?).unwrap_or(0))
}

fn domain_from_row(row: &StoreRow) -> StoreResult<DomainResult> {
    let mut domain = DomainResult::new(row.get_text("domain")?, row.get_i64("data_source_obj_id")?);
    domain.activity_start = row.get_i64("activity_start")?;
    domain.activity_end = row.get_i64("activity_end")?;
    domain.total_page_views = non_negative(row, "total_page_views")?;
    domain.page_views_in_recent_window = non_negative(row, "page_views_in_recent_window")?;
    domain.files_downloaded = non_negative(row, "files_downloaded")?;
    domain.files_downloaded_in_recent_window = non_negative(row, "files_downloaded_in_recent_window")?;
    domain.count_of_known_account_types = non_negative(row, "count_of_known_account_types")?;
    domain.account_types = row
        .opt_text("account_types")
        .map(|joined| {
            joined
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(domain)
}

/// Run the aggregate query and materialize one result per domain row.
/// Banned and blank domains are dropped as rows are read.
pub fn run_domain_query(filters: &[FilterRef], env: &SearchEnv<'_>) -> DiscoveryResult<Vec<SearchResult>> {
    env.context.check("domain search")?;

    let mut latest_activity = 0_i64;
    env.select("latest domain activity", &latest_activity_query(), |row| {
        latest_activity = latest_activity.max(row.get_i64("latest_activity")?);
        Ok(())
    })?;
    let window_days = i64::try_from(env.config.recent_activity_days).unwrap_or(i64::MAX / SECONDS_PER_DAY);
    let recent_cutoff = latest_activity.saturating_sub(window_days.saturating_mul(SECONDS_PER_DAY));

    let query = domain_aggregate_query(filters, recent_cutoff);
    let mut results = Vec::new();
    let mut banned = 0_usize;
    env.select("domain search", &query, |row| {
        let domain = domain_from_row(row)?;
        if domain.domain.trim().is_empty() {
            return Ok(());
        }
        if env.config.is_banned_domain(&domain.domain) {
            banned += 1;
            return Ok(());
        }
        results.push(SearchResult::Domain(domain));
        Ok(())
    })?;

    tracing::debug!(
        domains = results.len(),
        banned,
        latest_activity,
        "domain rows materialized"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{ArtifactDateRangeFilter, ArtifactTypeFilter};
    use std::sync::Arc;

    #[test]
    fn aggregate_query_restricts_to_web_artifacts() {
        let query = domain_aggregate_query(&[], 0);
        assert!(query.contains("AS activity_start"));
        assert!(query.contains("IN ('2','41','3','5','4','15','68')"));
        assert!(!query.contains("HAVING"));
    }

    #[test]
    fn filters_add_where_and_having_parts() {
        let filters: Vec<FilterRef> = vec![
            Arc::new(ArtifactTypeFilter::new(vec![ArtifactType::WebHistory])),
            Arc::new(ArtifactDateRangeFilter::new(100, 200)),
        ];
        let query = domain_aggregate_query(&filters, 50);
        assert!(query.contains("AND (blackboard_artifacts.artifact_type_id IN ('4','68'))"));
        assert!(!query.contains("AND (artifact_type_id"));
        assert!(query.ends_with(
            "HAVING (MAX(activity.activity_date) >= 100 AND MIN(activity.activity_date) <= 200)"
        ));
        assert!(query.contains("activity.activity_date >= 50"));
    }

    #[test]
    fn row_decoding_splits_account_types() {
        let row = StoreRow::new()
            .with("domain", "example.com")
            .with("data_source_obj_id", 3_i64)
            .with("activity_start", 10_i64)
            .with("activity_end", 20_i64)
            .with("total_page_views", 7_i64)
            .with("page_views_in_recent_window", 2_i64)
            .with("files_downloaded", 1_i64)
            .with("files_downloaded_in_recent_window", 0_i64)
            .with("count_of_known_account_types", 2_i64)
            .with("account_types", "Mail, Social");
        let domain = domain_from_row(&row).unwrap();
        assert_eq!(domain.domain, "example.com");
        assert_eq!(domain.data_source_id, 3);
        assert_eq!(domain.total_page_views, 7);
        assert_eq!(domain.account_types, vec!["Mail".to_string(), "Social".to_string()]);
        assert!(domain.has_known_account_type());
    }

    #[test]
    fn missing_account_aggregate_means_no_account_types() {
        let row = StoreRow::new()
            .with("domain", "example.com")
            .with("data_source_obj_id", 3_i64)
            .with("activity_start", 10_i64)
            .with("activity_end", 20_i64)
            .with("total_page_views", 0_i64)
            .with("page_views_in_recent_window", 0_i64)
            .with("files_downloaded", 0_i64)
            .with("files_downloaded_in_recent_window", 0_i64)
            .with("count_of_known_account_types", Option::<i64>::None)
            .with("account_types", Option::<String>::None);
        let domain = domain_from_row(&row).unwrap();
        assert!(domain.account_types.is_empty());
        assert!(!domain.has_known_account_type());
    }
}
