//! # 送信結果レポート
//!
//! [`BatchOutcome`] を呼び出し元向けのレポートに変換する。
//! 件数は常に含め、失敗の明細は詳細表示のときだけ含める。

use fragments_domain::{
    notification::NotificationKind,
    outcome::{BatchOutcome, DeliveryFailure},
};
use serde::Serialize;

/// レポートの詳細度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportVerbosity {
    /// 件数のみ
    #[default]
    Summary,
    /// 件数と失敗の明細
    Verbose,
}

impl ReportVerbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Self::Verbose
        } else {
            Self::Summary
        }
    }
}

/// 送信結果レポート
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub kind:      NotificationKind,
    /// 1 通以上あり、全件送信に成功したか
    pub success:   bool,
    pub total:     usize,
    pub delivered: usize,
    pub failed:    usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures:  Option<Vec<DeliveryFailure>>,
}

/// 送信結果からレポートを作成する
pub fn report(
    kind: NotificationKind,
    outcome: &BatchOutcome,
    verbosity: ReportVerbosity,
) -> DispatchReport {
    let failures = match verbosity {
        ReportVerbosity::Summary => None,
        ReportVerbosity::Verbose => Some(outcome.failures().to_vec()),
    };

    DispatchReport {
        kind,
        success: outcome.is_complete_success(),
        total: outcome.total(),
        delivered: outcome.delivered(),
        failed: outcome.failed(),
        failures,
    }
}

#[cfg(test)]
mod tests {
    use fragments_domain::{outcome::SendAttempt, recipient::Recipient};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn partially_failed() -> BatchOutcome {
        BatchOutcome::from_attempts(vec![
            (
                Recipient::new("a@example.com").unwrap(),
                SendAttempt::delivered("250 OK"),
            ),
            (
                Recipient::new("b@example.com").unwrap(),
                SendAttempt::failed("550 mailbox unavailable"),
            ),
            (
                Recipient::new("c@example.com").unwrap(),
                SendAttempt::delivered("250 OK"),
            ),
        ])
    }

    #[test]
    fn test_概要表示では件数のみを含む() {
        let report = report(
            NotificationKind::Broadcast,
            &partially_failed(),
            ReportVerbosity::Summary,
        );

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "kind": "broadcast",
                "success": false,
                "total": 3,
                "delivered": 2,
                "failed": 1,
            })
        );
    }

    #[test]
    fn test_詳細表示では失敗の明細を含む() {
        let report = report(
            NotificationKind::Newsletter,
            &partially_failed(),
            ReportVerbosity::Verbose,
        );

        assert_eq!(
            serde_json::to_value(&report).unwrap()["failures"],
            json!([{"recipient": "b@example.com", "reason": "550 mailbox unavailable"}])
        );
    }

    #[test]
    fn test_空の結果は成功として扱わない() {
        let report = report(
            NotificationKind::Wish,
            &BatchOutcome::empty(),
            ReportVerbosity::Verbose,
        );

        assert!(!report.success);
        assert_eq!(report.total, 0);
        assert_eq!(report.failures, Some(vec![]));
    }

    #[test]
    fn test_フラグから詳細度を決める() {
        assert_eq!(ReportVerbosity::from_flag(true), ReportVerbosity::Verbose);
        assert_eq!(ReportVerbosity::from_flag(false), ReportVerbosity::Summary);
    }
}
