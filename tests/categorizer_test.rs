mod helpers;

use std::sync::Arc;

use dossier::application::ports::LlmClientError;
use dossier::application::services::{CategorizeError, CategorizerService};
use dossier::domain::{AbsorbOutcome, Stage, StorageKey, UNKNOWN_CATEGORY};

use helpers::{ScriptedLlm, USER, get_json, memory_store, put_text};

const BANK_REPLY: &str = r#"{
  "fileName": "ignored-by-service.txt",
  "fileType": "txt",
  "summary": "Monthly bank statement",
  "categories": {
    "Financial": { "relevance": 9, "summary": "Card spending", "dataPoints": ["groceries", "rent"] }
  },
  "entityNames": ["Acme Bank"],
  "insights": ["Pays rent monthly"],
  "sensitiveInfo": true,
  "extractedProfile": {
    "financial": { "totalSpend": 1200, "banks": ["Acme Bank"] }
  }
}"#;

fn normalized(path: &str) -> StorageKey {
    StorageKey::new(USER, Stage::Normalized, path)
}

async fn seed(store: &Arc<dyn dossier::application::ports::BlobStore>, key: &StorageKey) {
    put_text(store, &key.to_string(), "Statement: rent 1000, groceries 200").await;
}

#[tokio::test]
async fn given_valid_reply_when_categorizing_then_result_and_master_profile_written() {
    let store = memory_store();
    let key = normalized("bank.txt");
    seed(&store, &key).await;
    let llm = Arc::new(ScriptedLlm::replying(BANK_REPLY));
    let service = CategorizerService::new(store.clone(), llm.clone());

    let outcome = service.categorize(&key, None).await.unwrap();

    assert_eq!(outcome.categories, vec!["financial"]);
    assert_eq!(outcome.profile, AbsorbOutcome::Added);
    assert!(!outcome.degraded);
    assert!(llm.prompts()[0].contains("rent 1000"));

    let result = get_json(&store, &outcome.result_key.to_string()).await;
    assert_eq!(result["fileName"], "bank.txt");
    assert_eq!(result["categories"]["financial"]["relevance"], 9);

    let profile = get_json(&store, &StorageKey::master_profile(USER).to_string()).await;
    assert_eq!(profile["fileCount"], 1);
    assert_eq!(profile["profile"]["financial"]["totalSpend"], 1200.0);
    assert_eq!(profile["categories"]["financial"]["count"], 1);
}

#[tokio::test]
async fn given_non_json_reply_when_categorizing_then_placeholder_written_and_profile_untouched() {
    let store = memory_store();
    let key = normalized("notes.txt");
    seed(&store, &key).await;
    let llm = Arc::new(ScriptedLlm::replying("I'm sorry, I can't help with that."));

    let outcome = CategorizerService::new(store.clone(), llm)
        .categorize(&key, None)
        .await
        .unwrap();

    assert!(outcome.degraded);
    assert_eq!(outcome.profile, AbsorbOutcome::Ignored);
    assert_eq!(outcome.categories, vec![UNKNOWN_CATEGORY]);

    let result = get_json(&store, &outcome.result_key.to_string()).await;
    assert_eq!(result["categories"][UNKNOWN_CATEGORY]["relevance"], 0);
    assert!(
        store
            .get(&StorageKey::master_profile(USER).to_string())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn given_ai_call_fails_when_categorizing_then_placeholder_not_error() {
    let store = memory_store();
    let key = normalized("notes.txt");
    seed(&store, &key).await;
    let llm = Arc::new(ScriptedLlm::new(vec![Err(LlmClientError::Timeout(60))]));

    let outcome = CategorizerService::new(store, llm)
        .categorize(&key, None)
        .await
        .unwrap();

    assert!(outcome.degraded);
    assert_eq!(outcome.parse_path, "failed");
}

#[tokio::test]
async fn given_json_wrapped_in_prose_when_categorizing_then_recovered() {
    let store = memory_store();
    let key = normalized("bank.txt");
    seed(&store, &key).await;
    let reply = format!("Here is the analysis:\n```json\n{BANK_REPLY}\n```\nHope this helps!");
    let llm = Arc::new(ScriptedLlm::new(vec![Ok(reply)]));

    let outcome = CategorizerService::new(store, llm)
        .categorize(&key, None)
        .await
        .unwrap();

    assert_eq!(outcome.parse_path, "recovered");
    assert_eq!(outcome.categories, vec!["financial"]);
}

#[tokio::test]
async fn given_same_file_twice_when_categorizing_then_profile_counts_it_once() {
    let store = memory_store();
    let key = normalized("bank.txt");
    seed(&store, &key).await;
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(BANK_REPLY.to_string()),
        Ok(BANK_REPLY.to_string()),
    ]));
    let service = CategorizerService::new(store.clone(), llm);

    service.categorize(&key, None).await.unwrap();
    let second = service.categorize(&key, None).await.unwrap();

    assert_eq!(second.profile, AbsorbOutcome::Redelivered);
    let profile = get_json(&store, &StorageKey::master_profile(USER).to_string()).await;
    assert_eq!(profile["sourceFiles"].as_array().unwrap().len(), 1);
    assert_eq!(profile["fileCount"], 1);
    assert_eq!(profile["profile"]["financial"]["totalSpend"], 1200.0);
    assert_eq!(profile["profile"]["financial"]["banks"], serde_json::json!(["Acme Bank"]));
    assert_eq!(profile["categories"]["financial"]["count"], 1);
}

#[tokio::test]
async fn given_input_over_limit_when_categorizing_then_prompt_is_truncated() {
    let store = memory_store();
    let key = normalized("long.txt");
    put_text(&store, &key.to_string(), &format!("{}TAIL", "é".repeat(100))).await;
    let llm = Arc::new(ScriptedLlm::replying(BANK_REPLY));

    CategorizerService::new(store, llm.clone())
        .with_input_limit(51)
        .categorize(&key, None)
        .await
        .unwrap();

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains(&"é".repeat(25)));
    assert!(!prompt.contains(&"é".repeat(26)));
    assert!(!prompt.contains("TAIL"));
}

#[tokio::test]
async fn given_raw_key_when_categorizing_then_wrong_stage() {
    let service = CategorizerService::new(memory_store(), Arc::new(ScriptedLlm::default()));

    let result = service
        .categorize(&StorageKey::new(USER, Stage::Raw, "a.txt"), None)
        .await;

    assert!(matches!(result, Err(CategorizeError::WrongStage(_))));
}

#[tokio::test]
async fn given_corrupt_master_profile_when_categorizing_then_error_and_nothing_overwritten() {
    let store = memory_store();
    let key = normalized("bank.txt");
    seed(&store, &key).await;
    let master = StorageKey::master_profile(USER).to_string();
    put_text(&store, &master, "{not json").await;
    let llm = Arc::new(ScriptedLlm::replying(BANK_REPLY));

    let result = CategorizerService::new(store.clone(), llm.clone())
        .categorize(&key, None)
        .await;

    assert!(matches!(result, Err(CategorizeError::InvalidMasterProfile(_))));
    assert_eq!(llm.calls(), 0);
    let bytes = store.get(&master).await.unwrap();
    assert_eq!(&bytes[..], b"{not json");
}

#[tokio::test]
async fn given_backlog_with_one_failure_when_reprocessing_then_every_file_attempted() {
    let store = memory_store();
    seed(&store, &normalized("a.txt")).await;
    seed(&store, &normalized("b.txt")).await;
    put_text(&store, &format!("{USER}/normalized/.hidden"), "skip").await;
    put_text(&store, &format!("{USER}/raw/c.txt"), "not in backlog").await;
    let llm = Arc::new(ScriptedLlm::new(vec![
        Ok(BANK_REPLY.to_string()),
        Err(LlmClientError::RateLimited),
    ]));

    let report = CategorizerService::new(store.clone(), llm.clone())
        .categorize_backlog(USER)
        .await
        .unwrap();

    assert_eq!(report.processed, vec!["a.txt", "b.txt"]);
    assert!(report.failed.is_empty());
    assert_eq!(llm.calls(), 2);
    let degraded = get_json(
        &store,
        &StorageKey::category_result(USER, "b.txt").to_string(),
    )
    .await;
    assert!(degraded["categories"].get(UNKNOWN_CATEGORY).is_some());
}
