//! # 送信結果
//!
//! 1 通ごとの送信試行結果 [`SendAttempt`] と、バッチ全体の集計 [`BatchOutcome`]。
//!
//! ## 不変条件
//!
//! - `delivered + failed == total`
//! - `failures.len() == failed`
//!
//! [`BatchOutcome`] のフィールドは private で、送信試行の列からしか構築できない。
//! そのため不変条件は構築時点で常に成り立つ。

use serde::Serialize;

use crate::recipient::Recipient;

/// 1 通の送信試行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendAttempt {
    /// 送信成功（プロバイダが返した応答トークン）
    Delivered(String),
    /// 送信失敗（理由）
    Failed(String),
}

impl SendAttempt {
    /// 1 通ごとのタイムアウトで打ち切られた場合の理由
    pub const TIMEOUT_REASON: &'static str = "timeout";
    /// 配信全体の期限切れで取り消された場合の理由
    pub const CANCELLED_REASON: &'static str = "cancelled";

    pub fn delivered(transport_response: impl Into<String>) -> Self {
        Self::Delivered(transport_response.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn timed_out() -> Self {
        Self::Failed(Self::TIMEOUT_REASON.to_string())
    }

    pub fn cancelled() -> Self {
        Self::Failed(Self::CANCELLED_REASON.to_string())
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Delivered(_) => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// 失敗した 1 通の宛先と理由
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    recipient: Recipient,
    reason:    String,
}

impl DeliveryFailure {
    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// バッチ全体の送信結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    total:     usize,
    delivered: usize,
    failures:  Vec<DeliveryFailure>,
}

impl BatchOutcome {
    /// 空のバッチの結果（すべて 0）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 送信試行の列を投入順に畳み込む
    pub fn from_attempts<I>(attempts: I) -> Self
    where
        I: IntoIterator<Item = (Recipient, SendAttempt)>,
    {
        attempts
            .into_iter()
            .fold(Self::empty(), |mut outcome, (recipient, attempt)| {
                outcome.total += 1;
                match attempt {
                    SendAttempt::Delivered(_) => outcome.delivered += 1,
                    SendAttempt::Failed(reason) => {
                        outcome.failures.push(DeliveryFailure { recipient, reason });
                    }
                }
                outcome
            })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// 失敗の一覧（投入順）
    pub fn failures(&self) -> &[DeliveryFailure] {
        &self.failures
    }

    /// 1 通以上あり、すべて送信できたか
    pub fn is_complete_success(&self) -> bool {
        self.total > 0 && self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn recipient(address: &str) -> Recipient {
        Recipient::new(address).unwrap()
    }

    #[test]
    fn test_空の試行列は全件0になる() {
        let outcome = BatchOutcome::from_attempts(Vec::new());

        assert_eq!(outcome, BatchOutcome::empty());
        assert_eq!(outcome.total(), 0);
        assert_eq!(outcome.delivered(), 0);
        assert_eq!(outcome.failed(), 0);
        assert!(outcome.failures().is_empty());
        assert!(!outcome.is_complete_success());
    }

    #[test]
    fn test_2通目の失敗だけが失敗一覧に入る() {
        let outcome = BatchOutcome::from_attempts(vec![
            (recipient("a@x.com"), SendAttempt::delivered("250 OK")),
            (recipient("b@x.com"), SendAttempt::failed("550 mailbox unavailable")),
            (recipient("c@x.com"), SendAttempt::delivered("250 OK")),
        ]);

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.delivered(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures()[0].recipient().as_str(), "b@x.com");
        assert_eq!(outcome.failures()[0].reason(), "550 mailbox unavailable");
    }

    #[test]
    fn test_集計の不変条件が成り立つ() {
        let attempts: Vec<(Recipient, SendAttempt)> = (0..25)
            .map(|i| {
                let attempt = if i % 3 == 0 {
                    SendAttempt::timed_out()
                } else {
                    SendAttempt::delivered(format!("id-{i}"))
                };
                (recipient(&format!("user{i}@x.com")), attempt)
            })
            .collect();

        let outcome = BatchOutcome::from_attempts(attempts);

        assert_eq!(outcome.delivered() + outcome.failed(), outcome.total());
        assert_eq!(outcome.failures().len(), outcome.failed());
        assert_eq!(outcome.failed(), 9);
    }

    #[test]
    fn test_失敗一覧は投入順を保持する() {
        let outcome = BatchOutcome::from_attempts(vec![
            (recipient("z@x.com"), SendAttempt::cancelled()),
            (recipient("a@x.com"), SendAttempt::timed_out()),
        ]);

        let reasons: Vec<(&str, &str)> = outcome
            .failures()
            .iter()
            .map(|f| (f.recipient().as_str(), f.reason()))
            .collect();
        assert_eq!(
            reasons,
            vec![("z@x.com", "cancelled"), ("a@x.com", "timeout")]
        );
    }

    #[test]
    fn test_send_attemptの失敗理由() {
        assert_eq!(SendAttempt::timed_out().failure_reason(), Some("timeout"));
        assert_eq!(SendAttempt::cancelled().failure_reason(), Some("cancelled"));
        assert_eq!(SendAttempt::delivered("ok").failure_reason(), None);
        assert!(SendAttempt::delivered("ok").is_delivered());
    }
}
