mod common;

use hovimestari::components::google_calendar::CalendarEvent;
use hovimestari::components::instances::{
    ChatMessage, Document, InstanceRegistry, InstanceSettings, MemoryField, MAX_CHAT_HISTORY,
};
use hovimestari::error::Error;

async fn registry() -> InstanceRegistry {
    InstanceRegistry::new(common::memory_storage())
}

#[tokio::test]
async fn test_create_unlock_and_reject_bad_pins() {
    let registry = registry().await;

    registry
        .create_instance(" Koti ", "1234", InstanceSettings::default())
        .await
        .unwrap();
    assert_eq!(registry.list_instances().await.unwrap(), vec!["Koti".to_string()]);

    assert!(matches!(
        registry
            .create_instance("koti", "5678", InstanceSettings::default())
            .await,
        Err(Error::Instance(_))
    ));
    assert!(registry
        .create_instance("Work", "12", InstanceSettings::default())
        .await
        .is_err());
    assert!(registry
        .create_instance("a:b", "1234", InstanceSettings::default())
        .await
        .is_err());

    let instance = registry.unlock("Koti", "1234").await.unwrap();
    assert_eq!(instance.name(), "Koti");
    assert!(registry.unlock("Koti", "4321").await.is_err());
    assert!(registry.unlock("Nobody", "1234").await.is_err());

    registry.change_pin("Koti", "1234", "987654").await.unwrap();
    assert!(registry.unlock("Koti", "1234").await.is_err());
    assert!(registry.unlock("Koti", "987654").await.is_ok());
}

#[tokio::test]
async fn test_instance_data_is_isolated_and_deleted() {
    let storage = common::memory_storage();
    let registry = InstanceRegistry::new(storage.clone());

    let home = registry
        .create_instance("Home", "1111", InstanceSettings::default())
        .await
        .unwrap();
    let work = registry
        .create_instance("Work", "2222", InstanceSettings::default())
        .await
        .unwrap();

    home.append_memory(MemoryField::Information, "Has a cat").await.unwrap();
    home.add_document(Document::new("notes.txt", "milk".to_string()))
        .await
        .unwrap();
    home.upsert_event(CalendarEvent::new("Vet", "2025-05-02", None))
        .await
        .unwrap();

    assert!(work.memory().await.unwrap().is_empty());
    assert!(work.documents().await.unwrap().is_empty());

    registry.delete_instance("Home", "1111").await.unwrap();
    assert!(storage.keys("instance:Home:").await.unwrap().is_empty());
    assert!(!storage.keys("instance:Work:").await.unwrap().is_empty());
    assert_eq!(registry.list_instances().await.unwrap(), vec!["Work".to_string()]);
}

#[tokio::test]
async fn test_settings_documents_events_and_history() {
    let registry = registry().await;
    let instance = registry
        .create_instance("Home", "1111", InstanceSettings::default())
        .await
        .unwrap();

    let mut settings = instance.settings().await.unwrap();
    settings.set("temperature", "0.1").unwrap();
    instance.save_settings(&settings).await.unwrap();
    assert_eq!(instance.settings().await.unwrap().temperature, 0.1);

    instance
        .add_document(Document::new("a.md", "first".to_string()))
        .await
        .unwrap();
    instance
        .add_document(Document::new("a.md", "second".to_string()))
        .await
        .unwrap();
    let documents = instance.documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].content, "second");
    assert!(instance.remove_document("a.md").await.unwrap());
    assert!(!instance.remove_document("a.md").await.unwrap());

    let late = CalendarEvent::new("Late", "2025-05-03", None);
    let early = CalendarEvent::new("Early", "2025-05-01", Some("08:00"));
    let late_id = late.id.clone();
    instance.save_events(&[late, early]).await.unwrap();
    let events = instance.events().await.unwrap();
    assert_eq!(events[0].title, "Early");
    assert!(instance.remove_event(&late_id).await.unwrap());
    assert_eq!(instance.events().await.unwrap().len(), 1);

    let messages: Vec<ChatMessage> = (0..MAX_CHAT_HISTORY + 5)
        .map(|i| ChatMessage::user(&format!("message {}", i)))
        .collect();
    instance.append_messages(&messages).await.unwrap();
    let history = instance.chat_history().await.unwrap();
    assert_eq!(history.len(), MAX_CHAT_HISTORY);
    assert_eq!(history[0].content, "message 5");

    instance.clear_chat().await.unwrap();
    assert!(instance.chat_history().await.unwrap().is_empty());

    instance
        .append_memory(MemoryField::TemporaryRequests, "Answer in English today")
        .await
        .unwrap();
    instance.clear_temporary_requests().await.unwrap();
    assert!(instance.memory().await.unwrap().is_empty());
}
