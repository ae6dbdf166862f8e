//! Webhook resource
//!
//! The signing secret is only returned by the create call, so it is carried
//! forward from the previous output on every read and update.

use crmkit::{Client, CreateWebhook, Subscription, UpdateWebhook, Webhook};
use declarative::{DeleteStrategy, Fields, KindRules, Notifier, Provider};
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, Result};
use super::search::find_first;
use super::{found, gone};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookInputs {
    pub target_url: String,
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookOutput {
    pub webhook_id: String,
    pub target_url: String,
    pub subscriptions: Vec<Subscription>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl WebhookOutput {
    fn from_remote(webhook: Webhook, prior_secret: Option<&String>) -> Self {
        Self {
            secret: webhook.secret.or_else(|| prior_secret.cloned()),
            webhook_id: webhook.webhook_id,
            target_url: webhook.target_url,
            subscriptions: webhook.subscriptions,
            status: webhook.status,
        }
    }
}

pub struct WebhookProvider<'a> {
    client: &'a Client,
}

impl<'a> WebhookProvider<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    fn search(&self, target_url: &str) -> Result<Option<Webhook>> {
        Ok(find_first(
            self.client,
            "list_webhooks",
            |api, page| api.list_webhooks(page),
            |webhook| webhook.target_url == target_url,
        )?)
    }
}

impl Provider for WebhookProvider<'_> {
    type Inputs = WebhookInputs;
    type Output = WebhookOutput;
    type Error = ProviderError;

    const KIND: &'static str = "webhook";
    const STABLE_FIELDS: &'static [&'static str] = &["webhook_id"];
    const RULES: KindRules = KindRules {
        replace_on: Fields::None,
        update_on: Fields::All,
        delete: DeleteStrategy::Hard,
    };

    fn read(
        &self,
        olds: Option<&WebhookInputs>,
        output: Option<&WebhookOutput>,
    ) -> Result<Option<WebhookOutput>> {
        let prior_secret = output.and_then(|o| o.secret.as_ref());
        if let Some(out) = output.filter(|o| !o.webhook_id.is_empty()) {
            let webhook = self
                .client
                .call("get_webhook", |api| api.get_webhook(&out.webhook_id));
            return Ok(found(webhook)?.map(|w| WebhookOutput::from_remote(w, prior_secret)));
        }
        match olds {
            Some(olds) => Ok(self
                .search(&olds.target_url)?
                .map(|w| WebhookOutput::from_remote(w, prior_secret))),
            None => Ok(None),
        }
    }

    fn create(&self, news: &WebhookInputs, notes: &mut dyn Notifier) -> Result<WebhookOutput> {
        if news.subscriptions.is_empty() {
            return Err(ProviderError::declaration(
                Self::KIND,
                "at least one subscription is required",
            ));
        }

        if let Some(existing) = self.search(&news.target_url)? {
            notes.note(&format!(
                "Idempotent Webhook: found existing {} (signing secret not recoverable)",
                news.target_url
            ));
            let output = WebhookOutput::from_remote(existing, None);
            if output.subscriptions != news.subscriptions {
                return self.update(news, &output, notes);
            }
            return Ok(output);
        }

        let request = CreateWebhook {
            target_url: news.target_url.clone(),
            subscriptions: news.subscriptions.clone(),
        };
        let created = self
            .client
            .call("create_webhook", |api| api.create_webhook(&request))?;
        notes.note(&format!("Created Webhook: {}", news.target_url));
        Ok(WebhookOutput::from_remote(created, None))
    }

    fn update(
        &self,
        news: &WebhookInputs,
        output: &WebhookOutput,
        notes: &mut dyn Notifier,
    ) -> Result<WebhookOutput> {
        if output.webhook_id.is_empty() {
            return Ok(output.clone());
        }
        let request = UpdateWebhook {
            target_url: Some(news.target_url.clone()),
            subscriptions: Some(news.subscriptions.clone()),
        };
        let updated = self.client.call("update_webhook", |api| {
            api.update_webhook(&output.webhook_id, &request)
        })?;
        notes.note(&format!("Updated Webhook: {}", updated.target_url));
        Ok(WebhookOutput::from_remote(updated, output.secret.as_ref()))
    }

    fn delete(
        &self,
        olds: &WebhookInputs,
        output: &WebhookOutput,
        notes: &mut dyn Notifier,
    ) -> Result<()> {
        let existed = !output.webhook_id.is_empty()
            && gone(self.client.call("delete_webhook", |api| {
                api.delete_webhook(&output.webhook_id)
            }))?;
        if existed {
            notes.note(&format!("Deleted Webhook: {}", olds.target_url));
        } else {
            notes.note(&format!("Already absent Webhook: {}", olds.target_url));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use declarative::{Decision, NoteBuffer};

    fn hook(url: &str, events: &[&str]) -> WebhookInputs {
        WebhookInputs {
            target_url: url.into(),
            subscriptions: events
                .iter()
                .map(|e| Subscription {
                    event_type: (*e).into(),
                    filter: None,
                })
                .collect(),
        }
    }

    const URL: &str = "https://hooks.example.com/crm";

    #[test]
    fn test_every_change_is_update() {
        let (client, _) = client();
        let provider = WebhookProvider::new(&client);
        let olds = hook(URL, &["record.created"]);

        assert_eq!(
            provider.diff(&hook(URL, &["record.updated"]), &olds),
            Some(Decision::Update)
        );
        assert_eq!(
            provider.diff(&hook("https://other.example.com", &["record.created"]), &olds),
            Some(Decision::Update)
        );
    }

    #[test]
    fn test_secret_survives_read_and_update() {
        let (client, _) = client();
        let provider = WebhookProvider::new(&client);
        let output = provider
            .create(&hook(URL, &["record.created"]), &mut NoteBuffer::new())
            .unwrap();
        assert!(output.secret.is_some());

        let read = provider.read(None, Some(&output)).unwrap().unwrap();
        assert_eq!(read.secret, output.secret);

        let updated = provider
            .update(&hook(URL, &["record.updated"]), &read, &mut NoteBuffer::new())
            .unwrap();
        assert_eq!(updated.secret, output.secret);
        assert_eq!(updated.subscriptions[0].event_type, "record.updated");
    }

    #[test]
    fn test_create_is_idempotent() {
        let (client, mock) = client();
        let provider = WebhookProvider::new(&client);
        let mut notes = NoteBuffer::new();

        let first = provider.create(&hook(URL, &["record.created"]), &mut notes).unwrap();
        let second = provider.create(&hook(URL, &["record.created"]), &mut notes).unwrap();

        assert_eq!(first.webhook_id, second.webhook_id);
        assert_eq!(mock.calls("create_webhook"), 1);
        assert!(notes.contains("Idempotent Webhook"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (client, mock) = client();
        let provider = WebhookProvider::new(&client);
        let news = hook(URL, &["record.created"]);
        let output = provider.create(&news, &mut NoteBuffer::new()).unwrap();

        let mut notes = NoteBuffer::new();
        provider.delete(&news, &output, &mut notes).unwrap();
        provider.delete(&news, &output, &mut notes).unwrap();

        assert_eq!(mock.calls("delete_webhook"), 2);
        assert!(notes.contains("Deleted Webhook"));
        assert!(notes.contains("Already absent Webhook"));
        assert_eq!(provider.read(Some(&news), None).unwrap(), None);
    }

    #[test]
    fn test_delete_without_id_makes_no_call() {
        let (client, mock) = client();
        let provider = WebhookProvider::new(&client);
        let news = hook(URL, &["record.created"]);
        let mut output = provider.create(&news, &mut NoteBuffer::new()).unwrap();
        output.webhook_id.clear();
        mock.reset_calls();

        let mut notes = NoteBuffer::new();
        provider.delete(&news, &output, &mut notes).unwrap();

        assert_eq!(mock.total_calls(), 0);
        assert!(notes.contains("Already absent Webhook"));
        assert!(provider.read(Some(&news), None).unwrap().is_some());
    }

    #[test]
    fn test_plain_http_is_rejected() {
        let (client, _) = client();
        let provider = WebhookProvider::new(&client);

        let err = provider
            .create(&hook("http://insecure.example.com", &["record.created"]), &mut NoteBuffer::new())
            .unwrap_err();

        assert_eq!(err.tag(), "validation");
    }
}
