//! Server performance diagnostics over the dynamic management views.
//!
//! All diagnostics here are read-only; results render through the normal
//! CSV path unless the operation has a bespoke line format.

use crate::db::StatementExecutor;
use crate::error::DbResult;
use crate::tools::cell;

const TOP_WAITS_SQL: &str = "\
SELECT TOP 10
    wait_type,
    wait_time_ms / 1000.0 AS wait_time_seconds,
    waiting_tasks_count,
    signal_wait_time_ms / 1000.0 AS signal_wait_time_seconds
FROM sys.dm_os_wait_stats
WHERE wait_type NOT IN (
    'CLR_SEMAPHORE', 'LAZYWRITER_SLEEP', 'RESOURCE_QUEUE', 'SLEEP_TASK',
    'SLEEP_SYSTEMTASK', 'SQLTRACE_BUFFER_FLUSH', 'WAITFOR', 'LOGMGR_QUEUE',
    'REQUEST_FOR_DEADLOCK_SEARCH', 'XE_TIMER_EVENT', 'XE_DISPATCHER_JOIN',
    'BROKER_TO_FLUSH', 'BROKER_TASK_STOP', 'CLR_MANUAL_EVENT', 'CLR_AUTO_EVENT',
    'DISPATCHER_QUEUE_SEMAPHORE', 'FT_IFTS_SCHEDULER_IDLE_WAIT', 'XE_DISPATCHER_WAIT',
    'BROKER_EVENTHANDLER', 'TRACEWRITE', 'XE_BUFFERMGR_ALLPROCESSES_WAIT',
    'SQLTRACE_INCREMENTAL_FLUSH_SLEEP'
)
ORDER BY wait_time_ms DESC";

const CONNECTION_STATS_SQL: &str = "\
SELECT
    login_name,
    host_name,
    program_name,
    status,
    COUNT(*) AS session_count
FROM sys.dm_exec_sessions
WHERE is_user_process = 1
GROUP BY login_name, host_name, program_name, status
ORDER BY session_count DESC";

const BLOCKING_SESSIONS_SQL: &str = "\
SELECT
    blocking_session_id AS BlockingSessionID,
    session_id AS BlockedSessionID,
    wait_type,
    wait_time,
    last_wait_type,
    wait_resource,
    TEXT AS SqlText
FROM sys.dm_exec_requests r
CROSS APPLY sys.dm_exec_sql_text(r.sql_handle)
WHERE blocking_session_id != 0
ORDER BY wait_time DESC";

const SLOW_QUERIES_SQL: &str = "\
SELECT TOP (@P1)
    qs.total_elapsed_time / qs.execution_count / 1000.0 AS avg_elapsed_ms,
    qs.max_elapsed_time / 1000.0 AS max_elapsed_ms,
    qs.execution_count,
    DB_NAME(st.dbid) AS database_name,
    st.text AS query_text
FROM sys.dm_exec_query_stats qs
CROSS APPLY sys.dm_exec_sql_text(qs.sql_handle) st
WHERE qs.execution_count > 0
  AND (qs.total_elapsed_time / qs.execution_count) >= (@P2 * 1000.0)
ORDER BY avg_elapsed_ms DESC";

const BUFFER_STATS_SQL: &str = "\
SELECT
    (SELECT COUNT(*) * 8.0 / 1024 FROM sys.dm_os_buffer_descriptors) AS buffer_pool_size_mb,
    (SELECT COUNT(*) * 8.0 / 1024 FROM sys.dm_os_buffer_descriptors WHERE is_modified = 1) AS dirty_pages_mb,
    (SELECT COUNT(*) * 8.0 / 1024 FROM sys.dm_os_buffer_descriptors WHERE is_modified = 0) AS clean_pages_mb,
    (SELECT cntr_value FROM sys.dm_os_performance_counters
     WHERE counter_name = 'Page life expectancy' AND object_name LIKE '%Buffer Manager%') AS page_life_expectancy_seconds,
    (SELECT cntr_value FROM sys.dm_os_performance_counters
     WHERE counter_name = 'Page reads/sec' AND object_name LIKE '%Buffer Manager%') AS page_reads_per_sec,
    (SELECT cntr_value FROM sys.dm_os_performance_counters
     WHERE counter_name = 'Page writes/sec' AND object_name LIKE '%Buffer Manager%') AS page_writes_per_sec,
    (SELECT cntr_value FROM sys.dm_os_performance_counters
     WHERE counter_name = 'Lazy writes/sec' AND object_name LIKE '%Buffer Manager%') AS lazy_writes_per_sec,
    (SELECT cntr_value FROM sys.dm_os_performance_counters
     WHERE counter_name = 'Checkpoint pages/sec' AND object_name LIKE '%Buffer Manager%') AS checkpoint_pages_per_sec";

pub async fn top_waits(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(TOP_WAITS_SQL).await
}

pub async fn connection_stats(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(CONNECTION_STATS_SQL).await
}

pub async fn blocking_sessions(executor: &StatementExecutor) -> DbResult<String> {
    let set = executor.fetch(BLOCKING_SESSIONS_SQL).await?;
    if set.is_empty() {
        return Ok("No current blocking sessions detected.".to_string());
    }
    Ok(set.to_csv())
}

pub async fn slow_queries(
    executor: &StatementExecutor,
    limit: u32,
    min_elapsed_ms: u32,
) -> DbResult<String> {
    let limit = limit.clamp(1, 100) as i32;
    let min_elapsed_ms = i32::try_from(min_elapsed_ms.max(1)).unwrap_or(i32::MAX);
    let set = executor
        .fetch_with_params(SLOW_QUERIES_SQL, &[&limit, &min_elapsed_ms])
        .await?;
    if set.is_empty() {
        return Ok("No slow queries found for the specified threshold.".to_string());
    }
    Ok(set.to_csv())
}

/// Scan recent error logs for failed login events.
///
/// The batch populates a temp table from `sp_readerrorlog` across the
/// retained log files, then selects the filtered rows; only the final
/// SELECT carries column metadata, so the earlier statements never reach
/// the output.
pub async fn failed_logins(executor: &StatementExecutor, time_period_minutes: u32) -> DbResult<String> {
    if time_period_minutes == 0 || time_period_minutes > 43_200 {
        return Ok("Please specify a valid time period in minutes (1 to 43200).".to_string());
    }

    // sp_readerrorlog cannot run under sp_executesql parameters, so the
    // validated integer is interpolated into the batch.
    let sql = format!(
        "DECLARE @Since datetime = DATEADD(MINUTE, -{}, GETDATE());

IF OBJECT_ID('tempdb..#FailedLogins') IS NOT NULL DROP TABLE #FailedLogins;
CREATE TABLE #FailedLogins (
    LogDate datetime,
    ProcessInfo nvarchar(100),
    Text nvarchar(max)
);

DECLARE @LogNumber int = 0;
WHILE (@LogNumber <= 6)
BEGIN
    INSERT INTO #FailedLogins
    EXEC sp_readerrorlog @LogNumber, 1, 'Login failed';
    SET @LogNumber = @LogNumber + 1;
END

SELECT
    LogDate,
    ProcessInfo,
    Text
FROM #FailedLogins
WHERE LogDate >= @Since
ORDER BY LogDate DESC;",
        time_period_minutes
    );

    let set = executor.fetch(&sql).await?;
    if set.is_empty() {
        return Ok("No failed login events found in the specified time period.".to_string());
    }

    let lines: Vec<String> = set
        .rows
        .iter()
        .map(|row| format!("[{}] {} - {}", cell(row, 0), cell(row, 1), cell(row, 2)))
        .collect();
    Ok(lines.join("\n"))
}

pub async fn buffer_stats(executor: &StatementExecutor) -> DbResult<String> {
    executor.run_read(BUFFER_STATS_SQL).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_waits_excludes_benign_wait_types() {
        assert!(TOP_WAITS_SQL.contains("LAZYWRITER_SLEEP"));
        assert!(TOP_WAITS_SQL.contains("ORDER BY wait_time_ms DESC"));
    }

    #[test]
    fn test_blocking_sql_filters_blocked_requests() {
        assert!(BLOCKING_SESSIONS_SQL.contains("blocking_session_id != 0"));
    }

    #[test]
    fn test_slow_queries_sql_takes_two_params() {
        assert!(SLOW_QUERIES_SQL.contains("TOP (@P1)"));
        assert!(SLOW_QUERIES_SQL.contains("@P2"));
    }

    #[test]
    fn test_connection_stats_groups_user_sessions() {
        assert!(CONNECTION_STATS_SQL.contains("is_user_process = 1"));
        assert!(CONNECTION_STATS_SQL.contains("GROUP BY"));
    }
}
