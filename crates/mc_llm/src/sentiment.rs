//! 外部 BERT 情感模型客户端
//!
//! 模型以 HTTP 服务形式部署，请求体为 `{"text": "..."}`。
//! 兼容三种常见的响应形态：
//! - `{"label": "negative", "score": 0.93}`
//! - `[{"label": "NEGATIVE", "score": 0.93}]`
//! - `[[{"label": "LABEL_0", "score": 0.93}, {"label": "LABEL_2", "score": 0.05}]]`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use mc_core::{Polarity, Sentiment};

use crate::provider::http_client;
use crate::token_bucket::TokenBucket;

/// 不透明的情感分析协作者
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> crate::Result<Sentiment>;
}

/// BERT 情感服务配置
#[derive(Debug, Clone)]
pub struct SentimentConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8501/predict".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentimentResponse {
    Single(LabelScore),
    Flat(Vec<LabelScore>),
    Nested(Vec<Vec<LabelScore>>),
}

/// 解析模型响应，多候选时取得分最高者
pub(crate) fn parse_sentiment_response(raw: &str) -> crate::Result<Sentiment> {
    let parsed: SentimentResponse = serde_json::from_str(raw)
        .map_err(|e| crate::MindCareError::Sentiment(format!("decode failed: {e}")))?;

    let candidates = match parsed {
        SentimentResponse::Single(one) => vec![one],
        SentimentResponse::Flat(list) => list,
        SentimentResponse::Nested(lists) => lists.into_iter().flatten().collect(),
    };

    let best = candidates
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| crate::MindCareError::Sentiment("empty prediction".to_string()))?;

    let polarity = Polarity::from_label(&best.label).ok_or_else(|| {
        crate::MindCareError::Sentiment(format!("unknown label: {}", best.label))
    })?;

    Ok(Sentiment::new(polarity, best.score))
}

/// BERT 情感服务 HTTP 客户端
pub struct BertSentimentClient {
    config: SentimentConfig,
    client: reqwest::Client,
    token_bucket: TokenBucket,
}

impl BertSentimentClient {
    pub fn new(config: SentimentConfig, token_bucket: TokenBucket) -> crate::Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self {
            config,
            client,
            token_bucket,
        })
    }
}

#[async_trait]
impl SentimentAnalyzer for BertSentimentClient {
    async fn analyze(&self, text: &str) -> crate::Result<Sentiment> {
        let _token = self.token_bucket.acquire().await?;

        let mut req = self
            .client
            .post(&self.config.endpoint)
            .json(&serde_json::json!({ "text": text }));
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| crate::MindCareError::Sentiment(format!("request failed: {e}")))?;

        let status = resp.status();
        let raw_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(crate::MindCareError::Sentiment(format!(
                "predict failed ({}): {}",
                status,
                raw_text.trim()
            )));
        }

        parse_sentiment_response(&raw_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_object() {
        let s = parse_sentiment_response(r#"{"label":"negative","score":0.93}"#).unwrap();
        assert_eq!(s.polarity, Polarity::Negative);
        assert!((s.confidence - 0.93).abs() < 1e-6);
    }

    #[test]
    fn test_parse_flat_list() {
        let s = parse_sentiment_response(r#"[{"label":"POSITIVE","score":0.81}]"#).unwrap();
        assert_eq!(s.polarity, Polarity::Positive);
    }

    #[test]
    fn test_parse_nested_picks_highest() {
        let raw = r#"[[{"label":"LABEL_0","score":0.12},{"label":"LABEL_1","score":0.08},{"label":"LABEL_2","score":0.80}]]"#;
        let s = parse_sentiment_response(raw).unwrap();
        assert_eq!(s.polarity, Polarity::Positive);
        assert!((s.confidence - 0.80).abs() < 1e-6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_sentiment_response("[]").is_err());
        assert!(parse_sentiment_response(r#"{"label":"joy","score":0.9}"#).is_err());
        assert!(parse_sentiment_response("<html>").is_err());
    }

    #[tokio::test]
    async fn test_analyze_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"text":"我好难过"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"label":"negative","score":0.97}"#)
            .create_async()
            .await;

        let client = BertSentimentClient::new(
            SentimentConfig {
                endpoint: format!("{}/predict", server.url()),
                ..Default::default()
            },
            TokenBucket::default_bucket(),
        )
        .unwrap();

        let s = client.analyze("我好难过").await.unwrap();
        assert_eq!(s.polarity, Polarity::Negative);
    }

    #[tokio::test]
    async fn test_analyze_maps_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/predict")
            .with_status(500)
            .create_async()
            .await;

        let client = BertSentimentClient::new(
            SentimentConfig {
                endpoint: format!("{}/predict", server.url()),
                ..Default::default()
            },
            TokenBucket::default_bucket(),
        )
        .unwrap();

        let err = client.analyze("hi").await.unwrap_err();
        assert!(matches!(err, crate::MindCareError::Sentiment(_)));
    }
}
