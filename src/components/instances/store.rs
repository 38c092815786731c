use super::models::{
    ChatMessage, Document, InstanceRecord, InstanceSettings, MemoryField, MemoryStore,
};
use super::pin::{generate_salt, hash_pin, validate_pin, verify_pin};
use crate::components::google_calendar::reconcile::sort_events;
use crate::components::google_calendar::CalendarEvent;
use crate::components::storage::{keys, StorageHandle};
use crate::error::{instance_error, AppResult};
use chrono::Utc;
use tracing::info;

/// Newest chat messages kept per instance
pub const MAX_CHAT_HISTORY: usize = 200;

const SETTINGS: &str = "settings";
const CHAT: &str = "chat";
const DOCUMENTS: &str = "documents";
const EVENTS: &str = "events";
const MEMORY: &str = "memory";

fn instance_prefix(name: &str) -> String {
    format!("{}{}:", keys::INSTANCE_PREFIX, name)
}

fn instance_key(name: &str, section: &str) -> String {
    format!("{}{}", instance_prefix(name), section)
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(instance_error("Instance name cannot be empty"));
    }
    if name.chars().any(|c| matches!(c, ':' | '*' | '?' | '[' | ']' | '\\')) {
        return Err(instance_error("Instance name cannot contain : * ? [ ] or \\"));
    }
    Ok(name.to_string())
}

/// Registry of all instances and their PINs
#[derive(Clone, Debug)]
pub struct InstanceRegistry {
    storage: StorageHandle,
}

impl InstanceRegistry {
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    async fn records(&self) -> AppResult<Vec<InstanceRecord>> {
        Ok(self
            .storage
            .load_json::<Vec<InstanceRecord>>(keys::INSTANCES)
            .await?
            .unwrap_or_default())
    }

    async fn save_records(&self, records: &[InstanceRecord]) -> AppResult<()> {
        self.storage.save_json(keys::INSTANCES, records).await
    }

    /// Names of all instances
    pub async fn list_instances(&self) -> AppResult<Vec<String>> {
        Ok(self.records().await?.into_iter().map(|r| r.name).collect())
    }

    /// Create an instance with initial settings
    pub async fn create_instance(
        &self,
        name: &str,
        pin: &str,
        settings: InstanceSettings,
    ) -> AppResult<Instance> {
        let name = validate_name(name)?;
        validate_pin(pin)?;

        let mut records = self.records().await?;
        if records.iter().any(|r| r.name.eq_ignore_ascii_case(&name)) {
            return Err(instance_error(&format!("Instance '{}' already exists", name)));
        }

        let salt = generate_salt();
        records.push(InstanceRecord {
            name: name.clone(),
            pin_hash: hash_pin(&salt, pin),
            salt,
            created_at: Utc::now(),
        });
        self.save_records(&records).await?;

        let instance = Instance {
            name: name.clone(),
            storage: self.storage.clone(),
        };
        instance.save_settings(&settings).await?;

        info!("Created instance {}", name);
        Ok(instance)
    }

    async fn verified_record(&self, name: &str, pin: &str) -> AppResult<(Vec<InstanceRecord>, usize)> {
        let records = self.records().await?;
        let index = records
            .iter()
            .position(|r| r.name == name.trim())
            .ok_or_else(|| instance_error(&format!("Instance '{}' not found", name.trim())))?;

        let record = &records[index];
        if !verify_pin(&record.salt, pin, &record.pin_hash) {
            return Err(instance_error("Incorrect PIN"));
        }

        Ok((records, index))
    }

    /// Open an instance after checking its PIN
    pub async fn unlock(&self, name: &str, pin: &str) -> AppResult<Instance> {
        let (records, index) = self.verified_record(name, pin).await?;
        Ok(Instance {
            name: records[index].name.clone(),
            storage: self.storage.clone(),
        })
    }

    /// Change an instance's PIN
    pub async fn change_pin(&self, name: &str, old_pin: &str, new_pin: &str) -> AppResult<()> {
        validate_pin(new_pin)?;
        let (mut records, index) = self.verified_record(name, old_pin).await?;

        let salt = generate_salt();
        records[index].pin_hash = hash_pin(&salt, new_pin);
        records[index].salt = salt;
        self.save_records(&records).await
    }

    /// Delete an instance and all of its data
    pub async fn delete_instance(&self, name: &str, pin: &str) -> AppResult<()> {
        let (mut records, index) = self.verified_record(name, pin).await?;
        let record = records.remove(index);

        for key in self.storage.keys(&instance_prefix(&record.name)).await? {
            self.storage.delete(&key).await?;
        }
        self.save_records(&records).await?;

        info!("Deleted instance {}", record.name);
        Ok(())
    }
}

/// One unlocked instance and its persisted data
#[derive(Clone, Debug)]
pub struct Instance {
    name: String,
    storage: StorageHandle,
}

impl Instance {
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn load<T: serde::de::DeserializeOwned + Default>(&self, section: &str) -> AppResult<T> {
        Ok(self
            .storage
            .load_json(&instance_key(&self.name, section))
            .await?
            .unwrap_or_default())
    }

    async fn save<T: serde::Serialize + ?Sized>(&self, section: &str, value: &T) -> AppResult<()> {
        self.storage
            .save_json(&instance_key(&self.name, section), value)
            .await
    }

    pub async fn settings(&self) -> AppResult<InstanceSettings> {
        self.load(SETTINGS).await
    }

    pub async fn save_settings(&self, settings: &InstanceSettings) -> AppResult<()> {
        self.save(SETTINGS, settings).await
    }

    pub async fn chat_history(&self) -> AppResult<Vec<ChatMessage>> {
        self.load(CHAT).await
    }

    /// Append messages, keeping only the newest ones
    pub async fn append_messages(&self, messages: &[ChatMessage]) -> AppResult<()> {
        let mut history = self.chat_history().await?;
        history.extend_from_slice(messages);

        if history.len() > MAX_CHAT_HISTORY {
            let excess = history.len() - MAX_CHAT_HISTORY;
            history.drain(..excess);
        }

        self.save(CHAT, &history).await
    }

    pub async fn clear_chat(&self) -> AppResult<()> {
        self.save(CHAT, &Vec::<ChatMessage>::new()).await
    }

    pub async fn documents(&self) -> AppResult<Vec<Document>> {
        self.load(DOCUMENTS).await
    }

    /// Add a document; one with the same name is replaced
    pub async fn add_document(&self, document: Document) -> AppResult<()> {
        let mut documents = self.documents().await?;
        documents.retain(|d| d.name != document.name);
        documents.push(document);
        self.save(DOCUMENTS, &documents).await
    }

    /// Remove a document by id or name
    pub async fn remove_document(&self, name_or_id: &str) -> AppResult<bool> {
        let mut documents = self.documents().await?;
        let before = documents.len();
        documents.retain(|d| d.id != name_or_id && d.name != name_or_id);

        if documents.len() == before {
            return Ok(false);
        }
        self.save(DOCUMENTS, &documents).await?;
        Ok(true)
    }

    pub async fn events(&self) -> AppResult<Vec<CalendarEvent>> {
        self.load(EVENTS).await
    }

    pub async fn save_events(&self, events: &[CalendarEvent]) -> AppResult<()> {
        let mut events = events.to_vec();
        sort_events(&mut events);
        self.save(EVENTS, &events).await
    }

    /// Insert an event or replace the one with the same id
    pub async fn upsert_event(&self, event: CalendarEvent) -> AppResult<()> {
        let mut events = self.events().await?;
        match events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => events.push(event),
        }
        self.save_events(&events).await
    }

    pub async fn remove_event(&self, id: &str) -> AppResult<bool> {
        let mut events = self.events().await?;
        let before = events.len();
        events.retain(|e| e.id != id);

        if events.len() == before {
            return Ok(false);
        }
        self.save_events(&events).await?;
        Ok(true)
    }

    pub async fn memory(&self) -> AppResult<MemoryStore> {
        self.load(MEMORY).await
    }

    pub async fn save_memory(&self, memory: &MemoryStore) -> AppResult<()> {
        self.save(MEMORY, memory).await
    }

    pub async fn append_memory(&self, field: MemoryField, text: &str) -> AppResult<MemoryStore> {
        let mut memory = self.memory().await?;
        memory.append(field, text);
        self.save_memory(&memory).await?;
        Ok(memory)
    }

    pub async fn clear_temporary_requests(&self) -> AppResult<()> {
        let mut memory = self.memory().await?;
        memory.temporary_requests.clear();
        self.save_memory(&memory).await
    }
}
