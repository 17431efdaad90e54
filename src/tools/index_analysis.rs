//! Index health diagnostics over the index DMVs.
//!
//! These are read-only catalog queries; results render through the normal
//! CSV path.

use crate::db::StatementExecutor;
use crate::error::DbResult;

const UNUSED_INDEXES_SQL: &str = "\
SELECT
    OBJECT_SCHEMA_NAME(i.object_id) AS SchemaName,
    OBJECT_NAME(i.object_id) AS TableName,
    i.name AS IndexName,
    user_seeks + user_scans + user_lookups + user_updates AS TotalAccesses
FROM sys.dm_db_index_usage_stats s
    INNER JOIN sys.indexes i ON s.object_id = i.object_id AND s.index_id = i.index_id
WHERE OBJECTPROPERTY(i.object_id, 'IsUserTable') = 1
    AND s.database_id = DB_ID()
    AND i.type_desc IN ('CLUSTERED', 'NONCLUSTERED')
    AND (user_seeks + user_scans + user_lookups) = 0
ORDER BY TotalAccesses ASC";

const MISSING_INDEXES_SQL: &str = "\
SELECT
    DB_NAME(mid.database_id) AS DatabaseName,
    OBJECT_NAME(mid.object_id, mid.database_id) AS TableName,
    migs.user_seeks,
    migs.user_scans,
    migs.avg_user_impact,
    mid.equality_columns,
    mid.inequality_columns,
    mid.included_columns
FROM sys.dm_db_missing_index_groups mig
    INNER JOIN sys.dm_db_missing_index_group_stats migs ON mig.index_group_handle = migs.group_handle
    INNER JOIN sys.dm_db_missing_index_details mid ON mig.index_handle = mid.index_handle
WHERE DB_NAME(mid.database_id) = DB_NAME()
ORDER BY migs.user_seeks DESC";

const FRAGMENTED_INDEXES_SQL: &str = "\
SELECT
    OBJECT_SCHEMA_NAME(i.object_id) AS SchemaName,
    OBJECT_NAME(i.object_id) AS TableName,
    i.name AS IndexName,
    i.type_desc AS IndexType,
    s.avg_fragmentation_in_percent AS FragmentationPercent,
    s.page_count AS PageCount,
    CASE
        WHEN s.avg_fragmentation_in_percent >= 30 THEN 'REBUILD'
        WHEN s.avg_fragmentation_in_percent >= 10 THEN 'REORGANIZE'
        ELSE 'OK'
    END AS RecommendedAction
FROM sys.dm_db_index_physical_stats(DB_ID(), NULL, NULL, NULL, 'LIMITED') s
    INNER JOIN sys.indexes i ON s.object_id = i.object_id AND s.index_id = i.index_id
WHERE s.avg_fragmentation_in_percent >= @P1
    AND s.page_count > 8
    AND i.name IS NOT NULL
    AND OBJECTPROPERTY(i.object_id, 'IsUserTable') = 1
ORDER BY s.avg_fragmentation_in_percent DESC, s.page_count DESC";

const INDEX_USAGE_SQL: &str = "\
SELECT
    OBJECT_SCHEMA_NAME(i.object_id) AS SchemaName,
    OBJECT_NAME(i.object_id) AS TableName,
    i.name AS IndexName,
    i.type_desc AS IndexType,
    ISNULL(s.user_seeks, 0) AS UserSeeks,
    ISNULL(s.user_scans, 0) AS UserScans,
    ISNULL(s.user_lookups, 0) AS UserLookups,
    ISNULL(s.user_updates, 0) AS UserUpdates,
    ISNULL(s.user_seeks + s.user_scans + s.user_lookups, 0) AS TotalReads
FROM sys.indexes i
    LEFT JOIN sys.dm_db_index_usage_stats s
        ON i.object_id = s.object_id
        AND i.index_id = s.index_id
        AND s.database_id = DB_ID()
WHERE i.object_id > 100
    AND i.is_hypothetical = 0
    AND i.is_disabled = 0
    AND OBJECT_SCHEMA_NAME(i.object_id) NOT IN ('sys', 'INFORMATION_SCHEMA')
ORDER BY TotalReads DESC, UserUpdates DESC";

pub async fn unused(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(UNUSED_INDEXES_SQL).await
}

pub async fn missing(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(MISSING_INDEXES_SQL).await
}

pub async fn fragmented(executor: &StatementExecutor, min_fragmentation: f64) -> DbResult<String> {
    let set = executor
        .fetch_with_params(FRAGMENTED_INDEXES_SQL, &[&min_fragmentation])
        .await?;
    if set.is_empty() {
        return Ok(format!(
            "No indexes found with fragmentation >= {}%.",
            min_fragmentation
        ));
    }
    Ok(set.to_csv())
}

pub async fn usage_stats(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(INDEX_USAGE_SQL).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unused_sql_requires_zero_reads() {
        assert!(UNUSED_INDEXES_SQL.contains("(user_seeks + user_scans + user_lookups) = 0"));
    }

    #[test]
    fn test_fragmented_sql_takes_threshold_param() {
        assert!(FRAGMENTED_INDEXES_SQL.contains("avg_fragmentation_in_percent >= @P1"));
        assert!(FRAGMENTED_INDEXES_SQL.contains("dm_db_index_physical_stats"));
    }

    #[test]
    fn test_missing_sql_scoped_to_current_database() {
        assert!(MISSING_INDEXES_SQL.contains("DB_NAME(mid.database_id) = DB_NAME()"));
    }

    #[test]
    fn test_usage_sql_excludes_system_objects() {
        assert!(INDEX_USAGE_SQL.contains("i.object_id > 100"));
        assert!(INDEX_USAGE_SQL.contains("NOT IN ('sys', 'INFORMATION_SCHEMA')"));
    }
}
