//! The per-invocation pipeline state machine.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use talon_core::{InvocationRequest, PluginResult};
use talon_crypto::{cipher, codec, kdf, mac};
use talon_loader::PluginLoader;
use talon_logging::redact_secrets;
use talon_providers::{ArtifactProvider, EnvSecrets, LocalArtifactProvider, SecretProvider};

/// Timeout applied when neither `settings.timeoutMs` nor
/// `PLUGIN_TIMEOUT_MS` yields a usable value.
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;

/// Environment key under which plugin `name` stores its signature.
///
/// `csv-export` → `PLUGIN_SIG_CSV_EXPORT`.
pub fn signature_key(plugin_name: &str) -> String {
    format!("PLUGIN_SIG_{}", plugin_name.replace('-', "_").to_uppercase())
}

/// Orchestrates one invocation: constructed with the request, consumed by
/// [`Orchestrator::process`], then discarded.
///
/// `process` has total-function semantics: it always returns a string.
/// Verification failures, missing artifacts, timeouts, and plugin errors
/// each collapse to their fixed failure string; nothing escapes as an error.
pub struct Orchestrator {
    request: InvocationRequest,
    artifacts: Box<dyn ArtifactProvider>,
    secrets: Box<dyn SecretProvider>,
    secret_key: [u8; kdf::KEY_LEN],
    invocation: Uuid,
}

impl Orchestrator {
    /// Builds an orchestrator over the local filesystem and the process
    /// environment.
    pub fn new(request: InvocationRequest) -> Self {
        Self::with_providers(
            request,
            Box::new(LocalArtifactProvider),
            Box::new(EnvSecrets::load()),
        )
    }

    /// Builds an orchestrator with explicit providers. The shared key is
    /// derived from `SECRET_KEY` once, here, and held for the lifetime of
    /// the invocation.
    pub fn with_providers(
        request: InvocationRequest,
        artifacts: Box<dyn ArtifactProvider>,
        secrets: Box<dyn SecretProvider>,
    ) -> Self {
        let passphrase = secrets.get("SECRET_KEY").unwrap_or_else(|| {
            warn!("SECRET_KEY is not set; artifact verification cannot succeed");
            String::new()
        });
        let secret_key = kdf::derive(&passphrase);
        Self {
            request,
            artifacts,
            secrets,
            secret_key,
            invocation: Uuid::new_v4(),
        }
    }

    /// Runs the full pipeline and returns the encoded result or a failure
    /// string.
    pub async fn process(mut self) -> String {
        info!(
            invocation = %self.invocation,
            plugin = %self.request.meta.plugin_name,
            "pipeline started"
        );

        let path = self.artifacts.resolve(&self.request.meta.file_location);
        if !path.exists() {
            error!(
                invocation = %self.invocation,
                location = %self.request.meta.file_location,
                "artifact missing or unreadable"
            );
            return "plugin doesn't exist or no permissions to access file".to_string();
        }
        debug!(invocation = %self.invocation, path = %path.display(), "artifact resolved");

        if !self.verify_artifact(&path) {
            error!(invocation = %self.invocation, "artifact signature rejected");
            return "plugin verification failed".to_string();
        }
        debug!(invocation = %self.invocation, "artifact signature verified");

        if self.request.meta.encrypted_input {
            if let Err(reason) = self.decrypt_input() {
                error!(invocation = %self.invocation, "input decryption failed");
                return format!("plugin execution failed: {reason}");
            }
            debug!(invocation = %self.invocation, "input decrypted");
        }

        let timeout_ms = self.resolve_timeout_ms();
        debug!(invocation = %self.invocation, timeout_ms, "timeout resolved");

        let loader = PluginLoader::new(
            self.request.meta.clone(),
            self.request.input.clone(),
            self.request.settings.clone(),
        );
        let result = loader.execute(&path, timeout_ms).await;

        let payload = match result {
            PluginResult::Timeout => {
                warn!(invocation = %self.invocation, timeout_ms, "plugin timed out");
                return "plugin timed out".to_string();
            }
            PluginResult::Error(reason) => {
                error!(
                    invocation = %self.invocation,
                    reason = %redact_secrets(&reason),
                    "plugin execution failed"
                );
                return format!("plugin execution failed: {reason}");
            }
            PluginResult::Ok(payload) => payload,
        };

        let payload = if self.request.meta.encrypt_output {
            match cipher::encrypt(&String::from_utf8_lossy(&payload), &self.secret_key) {
                Ok(envelope) => envelope,
                Err(e) => {
                    error!(invocation = %self.invocation, "output encryption failed");
                    return format!("plugin execution failed: {e}");
                }
            }
        } else {
            payload
        };

        let encoded = if self.request.meta.url_safe_output {
            codec::encode_urlsafe(&payload)
        } else {
            codec::encode_standard(&payload)
        };
        info!(
            invocation = %self.invocation,
            payload_bytes = payload.len(),
            "pipeline completed"
        );
        encoded
    }

    /// Recomputes HMAC-SHA256 over the artifact bytes and compares it, in
    /// constant time, to the stored signature. Any failure along the way
    /// (unreadable file, missing entry, bad Base64) is a verification
    /// failure, not an error.
    fn verify_artifact(&self, path: &Path) -> bool {
        let bytes = match self.artifacts.read(path) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let key_name = signature_key(&self.request.meta.plugin_name);
        let Some(expected_b64) = self.secrets.get(&key_name) else {
            return false;
        };
        let Ok(expected) = codec::decode_standard(&expected_b64) else {
            return false;
        };
        mac::verify(&self.secret_key, &bytes, &expected)
    }

    /// Replaces the `input` section with one whose `data` field holds the
    /// decrypted plaintext. Downstream code never observes the ciphertext.
    fn decrypt_input(&mut self) -> Result<(), String> {
        let Some(encoded) = self.request.input.get("data").and_then(Value::as_str) else {
            return Err("missing input.data".to_string());
        };
        let envelope = codec::decode_standard(encoded).map_err(|e| e.to_string())?;
        let plaintext = cipher::decrypt(&envelope, &self.secret_key).map_err(|e| e.to_string())?;

        let mut input = self.request.input.clone();
        if let Some(section) = input.as_object_mut() {
            section.insert("data".to_string(), Value::String(plaintext));
        }
        self.request.input = input;
        Ok(())
    }

    /// Timeout tiers: `settings.timeoutMs`, then `PLUGIN_TIMEOUT_MS`, then
    /// the default. Non-numeric values fall through silently.
    fn resolve_timeout_ms(&self) -> i64 {
        if let Some(ms) = timeout_from_value(self.request.settings.get("timeoutMs")) {
            return ms;
        }
        if let Some(raw) = self.secrets.get("PLUGIN_TIMEOUT_MS") {
            if let Ok(ms) = raw.trim().parse::<i64>() {
                return ms;
            }
        }
        DEFAULT_TIMEOUT_MS
    }
}

fn timeout_from_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}


#[cfg(all(test, unix))]
mod pipeline_tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};
    use talon_providers::MapSecrets;

    const MASTER: &str = "pipeline-test-master";

    fn key() -> [u8; kdf::KEY_LEN] {
        kdf::derive(MASTER)
    }

    fn write_plugin(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("plugin.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn sign(path: &PathBuf) -> String {
        let bytes = std::fs::read(path).unwrap();
        mac::mac_base64(&key(), &bytes).unwrap()
    }

    fn meta_for(path: &PathBuf, flags: Value) -> Value {
        let mut meta = serde_json::json!({
            "pluginName": "t",
            "pluginMainClass": "T",
            "fileLocation": path.display().to_string(),
        });
        if let (Some(meta_obj), Some(flag_obj)) = (meta.as_object_mut(), flags.as_object()) {
            for (k, v) in flag_obj {
                meta_obj.insert(k.clone(), v.clone());
            }
        }
        meta
    }

    fn engine(
        meta: Value,
        input: Value,
        settings: Value,
        secrets: Vec<(&str, String)>,
    ) -> Orchestrator {
        let mut entries = vec![("SECRET_KEY", MASTER.to_string())];
        entries.extend(secrets);
        Orchestrator::with_providers(
            InvocationRequest {
                meta: serde_json::from_value(meta).unwrap(),
                input,
                settings,
            },
            Box::new(LocalArtifactProvider),
            Box::new(MapSecrets::new(entries)),
        )
    }

    #[tokio::test]
    async fn happy_path_encodes_plugin_output() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"b2s="}\n'"#);
        let sig = sign(&plugin);
        let result = engine(
            meta_for(&plugin, serde_json::json!({})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert_eq!(result, "b2s=");
    }

    #[tokio::test]
    async fn urlsafe_output_substitutes_alphabet() {
        // Payload bytes 0xFB 0xEF 0xBF encode to "+++/" standard, "---_"
        // URL-safe.
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"+++/"}\n'"#);
        let sig = sign(&plugin);
        let result = engine(
            meta_for(&plugin, serde_json::json!({"urlSafeOutput": true})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert_eq!(result, "---_");
        assert!(!result.contains('+'));
        assert!(!result.contains('/'));
    }

    #[tokio::test]
    async fn missing_artifact_short_circuits() {
        let result = engine(
            serde_json::json!({
                "pluginName": "t",
                "pluginMainClass": "T",
                "fileLocation": "/nonexistent/talon/plugin",
            }),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![],
        )
        .process()
        .await;
        assert_eq!(result, "plugin doesn't exist or no permissions to access file");
    }

    #[tokio::test]
    async fn signature_over_other_bytes_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"b2s="}\n'"#);
        let wrong_sig = mac::mac_base64(&key(), b"some other artifact").unwrap();
        let result = engine(
            meta_for(&plugin, serde_json::json!({})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", wrong_sig)],
        )
        .process()
        .await;
        assert_eq!(result, "plugin verification failed");
    }

    #[tokio::test]
    async fn absent_signature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"b2s="}\n'"#);
        let result = engine(
            meta_for(&plugin, serde_json::json!({})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![],
        )
        .process()
        .await;
        assert_eq!(result, "plugin verification failed");
    }

    #[tokio::test]
    async fn slow_plugin_reports_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, "sleep 10");
        let sig = sign(&plugin);
        let start = Instant::now();
        let result = engine(
            meta_for(&plugin, serde_json::json!({})),
            serde_json::json!({}),
            serde_json::json!({"timeoutMs": 50}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert_eq!(result, "plugin timed out");
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn loader_reason_is_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":false,"error":"boom"}\n'"#);
        let sig = sign(&plugin);
        let result = engine(
            meta_for(&plugin, serde_json::json!({})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert_eq!(result, "plugin execution failed: plugin exception: boom");
    }

    #[tokio::test]
    async fn encrypted_round_trip() {
        // The plugin only answers with base64("hello") when it sees the
        // decrypted plaintext in input.data, proving the rewrite happened.
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(
            &dir,
            concat!(
                "read line\n",
                "case \"$line\" in\n",
                "*'\"data\":\"hello\"'*) printf '{\"ok\":true,\"payload\":\"aGVsbG8=\"}\\n';;\n",
                "*) printf '{\"ok\":false,\"error\":\"saw ciphertext\"}\\n';;\n",
                "esac"
            ),
        );
        let sig = sign(&plugin);
        let ciphertext = codec::encode_standard(&cipher::encrypt("hello", &key()).unwrap());
        let result = engine(
            meta_for(
                &plugin,
                serde_json::json!({"encryptedInput": true, "encryptOutput": true}),
            ),
            serde_json::json!({"data": ciphertext}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;

        let envelope = codec::decode_standard(&result).unwrap();
        assert_eq!(cipher::decrypt(&envelope, &key()).unwrap(), "hello");
    }

    #[tokio::test]
    async fn encrypted_input_without_data_field() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"b2s="}\n'"#);
        let sig = sign(&plugin);
        let result = engine(
            meta_for(&plugin, serde_json::json!({"encryptedInput": true})),
            serde_json::json!({}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert_eq!(result, "plugin execution failed: missing input.data");
    }

    #[tokio::test]
    async fn garbled_ciphertext_is_a_pipeline_failure() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(&dir, r#"read line; printf '{"ok":true,"payload":"b2s="}\n'"#);
        let sig = sign(&plugin);
        let result = engine(
            meta_for(&plugin, serde_json::json!({"encryptedInput": true})),
            serde_json::json!({"data": "definitely not base64!!"}),
            serde_json::json!({}),
            vec![("PLUGIN_SIG_T", sig)],
        )
        .process()
        .await;
        assert!(result.starts_with("plugin execution failed: "));
    }
}
