//! LLM-backed relevance oracle talking to an Ollama server.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ragdb_core::traits::{OracleCandidate, RerankOracle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Assistant prefill that nudges the model straight into a JSON code block.
const JSON_PREFILL: &str = "```json";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

pub struct OllamaOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaOracle {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client for rerank oracle")?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), model: model.to_string() })
    }
}

#[async_trait]
impl RerankOracle for OllamaOracle {
    async fn rank(&self, query: &str, candidates: &[OracleCandidate], k: usize) -> Result<Vec<i64>> {
        let prompt = build_prompt(query, candidates, k);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "user", content: &prompt },
                ChatMessage { role: "assistant", content: JSON_PREFILL },
            ],
            stream: false,
        };
        let url = format!("{}/api/chat", self.base_url);
        debug!(%url, model = %self.model, candidates = candidates.len(), k, "asking oracle to rerank");

        let response = self.client.post(&url).json(&request).send().await.context("sending rerank request")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("rerank oracle returned {status}: {body}");
        }
        let reply: ChatResponse = response.json().await.context("decoding rerank response")?;
        parse_ranking(&reply.message.content)
    }
}

pub fn build_prompt(query: &str, candidates: &[OracleCandidate], k: usize) -> String {
    let documents = candidates
        .iter()
        .map(|c| {
            format!(
                "<document>\n<document_id>{}</document_id>\n<document_content>{}</document_content>\n</document>",
                c.id, c.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are about to be given a set of documents, along with an id of each.\n\
         Your task is to select the {k} most relevant documents to answer the user's question.\n\n\
         Here is the user's question:\n<question>\n{query}\n</question>\n\n\
         Here are the documents to select from:\n<documents>\n{documents}\n</documents>\n\n\
         Respond in the following format:\n```json\n{{\n    \"document_ids\": [list of document ids as numbers, \
         {k} elements long, sorted in order of decreasing relevance]\n}}\n```"
    )
}

/// Extracts `document_ids` from an oracle reply.
///
/// Accepts bare JSON, JSON wrapped in a code fence (with or without the
/// opening fence, since the prefill already supplies it) and a leading
/// `<think>` block. Entries that are not integers are ignored.
pub fn parse_ranking(reply: &str) -> Result<Vec<i64>> {
    let mut body = reply.trim();
    if let Some(end) = body.find("</think>") {
        body = body[end + "</think>".len()..].trim_start();
    }
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(end) = body.find("```") {
        body = &body[..end];
    }
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => bail!("no JSON object in oracle reply"),
    };

    let value: Value = serde_json::from_str(json).context("oracle reply is not valid JSON")?;
    let ids = value
        .get("document_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("oracle reply has no document_ids array"))?;
    Ok(ids.iter().filter_map(Value::as_i64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_every_candidate_with_its_id() {
        let candidates = vec![
            OracleCandidate { id: 0, content: "alpha".into() },
            OracleCandidate { id: 1, content: "beta".into() },
        ];
        let prompt = build_prompt("which letter?", &candidates, 1);
        assert!(prompt.contains("<document_id>0</document_id>\n<document_content>alpha</document_content>"));
        assert!(prompt.contains("<document_id>1</document_id>"));
        assert!(prompt.contains("<question>\nwhich letter?\n</question>"));
        assert!(prompt.contains("select the 1 most relevant"));
    }
}
