use super::EditorMode;
use crate::auth::{Principal, SessionContext};
use crate::collection::{OrderingDomain, derive_records};
use crate::core::{CmsError, Fields, RecordKey, Result, StorePath};
use crate::notify::ChangeNotifier;
use crate::storage::{RawTree, SharedStore, Subscription};
use serde::Serialize;
use serde_json::{Value, json};

pub const FOOTER_PATH: &str = "footer";
pub const DEFAULT_FOOTER_TEXT: &str = "© 2024 PixelPunk Studio. Design that hits different.";

const SECTION: &str = "Footer";

/// The two keyed lists nested under the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterList {
    Links,
    Social,
}

impl FooterList {
    fn segment(&self) -> &'static str {
        match self {
            Self::Links => "links",
            Self::Social => "social",
        }
    }

    fn editable(&self, field: &str) -> bool {
        match self {
            Self::Links => matches!(field, "label" | "url"),
            Self::Social => matches!(field, "platform" | "url"),
        }
    }

    fn defaults(&self) -> Value {
        match self {
            Self::Links => json!({"label": "New Link", "url": "#"}),
            Self::Social => json!({"platform": "facebook", "url": "#"}),
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Links => "link",
            Self::Social => "social link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterLink {
    pub key: RecordKey,
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialLink {
    pub key: RecordKey,
    pub platform: String,
    pub url: String,
}

/// Footer as displayed. Lists keep the store's key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterContent {
    pub text: String,
    pub links: Vec<FooterLink>,
    pub social: Vec<SocialLink>,
}

impl FooterContent {
    /// An absent footer reads as the default text with no links.
    pub fn from_tree(tree: &RawTree) -> Self {
        let text = tree
            .as_ref()
            .and_then(|t| t.get("text"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FOOTER_TEXT)
            .to_string();

        let list = |list: FooterList| {
            let subtree = tree.as_ref().and_then(|t| t.get(list.segment())).cloned();
            StorePath::parse(list.segment())
                .map(|path| derive_records(&subtree, &OrderingDomain::new(path)))
                .unwrap_or_default()
        };

        let text_of = |fields: &Fields, name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            text,
            links: list(FooterList::Links)
                .into_iter()
                .map(|r| FooterLink {
                    label: text_of(&r.fields, "label"),
                    url: text_of(&r.fields, "url"),
                    key: r.key,
                })
                .collect(),
            social: list(FooterList::Social)
                .into_iter()
                .map(|r| SocialLink {
                    platform: text_of(&r.fields, "platform"),
                    url: text_of(&r.fields, "url"),
                    key: r.key,
                })
                .collect(),
        }
    }
}

/// Editor for the single footer object.
pub struct FooterEditor {
    store: SharedStore,
    notifier: ChangeNotifier,
    principal: Principal,
    path: StorePath,
    subscription: Subscription,
    content: FooterContent,
    mode: EditorMode,
}

impl FooterEditor {
    pub async fn open(
        store: SharedStore,
        session: &SessionContext,
        notifier: ChangeNotifier,
    ) -> Result<Self> {
        let principal = session.require_principal()?;
        let path = StorePath::parse(FOOTER_PATH)?;
        let mut subscription = store.subscribe_tree(&path).await?;
        let initial = subscription
            .next()
            .await
            .ok_or_else(|| CmsError::SubscriptionClosed(path.to_string()))?;
        Ok(Self {
            store,
            notifier,
            principal,
            path,
            subscription,
            content: FooterContent::from_tree(&initial),
            mode: EditorMode::Editing,
        })
    }

    pub fn content(&self) -> &FooterContent {
        &self.content
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn toggle_preview(&mut self) -> EditorMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn refresh(&mut self) -> bool {
        match self.subscription.latest() {
            Some(tree) => {
                self.content = FooterContent::from_tree(&tree);
                true
            }
            None => false,
        }
    }

    pub async fn wait_for_change(&mut self) -> Result<()> {
        let tree = self
            .subscription
            .next()
            .await
            .ok_or_else(|| CmsError::SubscriptionClosed(self.path.to_string()))?;
        self.content = FooterContent::from_tree(&tree);
        self.refresh();
        Ok(())
    }

    pub async fn set_text(&mut self, text: &str) -> Result<()> {
        let path = self.path.child("text")?;
        self.store
            .write_field(&path, Value::from(text))
            .await
            .map_err(CmsError::into_store_write)?;
        self.notifier.content_changed(SECTION, "Updated text");
        Ok(())
    }

    pub async fn add(&mut self, list: FooterList) -> Result<RecordKey> {
        let fields = match list.defaults() {
            Value::Object(fields) => fields,
            _ => Fields::new(),
        };
        let key = self
            .store
            .append_record(&self.path.child(list.segment())?, fields)
            .map_err(CmsError::into_store_write)?
            .durable()
            .await
            .map_err(CmsError::into_store_write)?;
        self.notifier
            .content_changed(SECTION, &format!("Added {}", list.noun()));
        Ok(key)
    }

    pub async fn update(
        &mut self,
        list: FooterList,
        key: &RecordKey,
        field: &str,
        value: &str,
    ) -> Result<()> {
        if !list.editable(field) {
            return Err(CmsError::Validation(format!(
                "'{}' is not an editable field of a footer {}",
                field,
                list.noun()
            )));
        }
        self.require_entry(list, key)?;
        let path = self.path.child(list.segment())?.field(key, field)?;
        self.store
            .write_field(&path, Value::from(value))
            .await
            .map_err(CmsError::into_store_write)
    }

    /// Remove an entry once `confirm` accepts the prompt. `false` when declined.
    pub async fn delete<F>(&mut self, list: FooterList, key: &RecordKey, confirm: F) -> Result<bool>
    where
        F: FnOnce(&str) -> bool,
    {
        self.require_entry(list, key)?;
        let prompt = format!("Are you sure you want to delete this {}?", list.noun());
        if !confirm(&prompt) {
            return Ok(false);
        }
        let path = self.path.child(list.segment())?.child(key.as_str())?;
        self.store
            .delete_record(&path)
            .await
            .map_err(CmsError::into_store_write)?;
        self.notifier
            .content_changed(SECTION, &format!("Deleted {}", list.noun()));
        Ok(true)
    }

    pub fn close(self) {
        self.subscription.unsubscribe();
    }

    fn require_entry(&self, list: FooterList, key: &RecordKey) -> Result<()> {
        let known = match list {
            FooterList::Links => self.content.links.iter().any(|l| &l.key == key),
            FooterList::Social => self.content.social.iter().any(|s| &s.key == key),
        };
        if known {
            Ok(())
        } else {
            Err(CmsError::RecordNotFound(key.to_string()))
        }
    }
}
