use relaycast_core::{PeerId, RoomId};
use relaycast_server::{RoomDirectory, RoomRegistry};

#[tokio::test]
async fn test_directory_lists_live_rooms_only() {
    let registry = RoomRegistry::new();
    let directory: &dyn RoomDirectory = &registry;

    let reserved = directory.create_room().await;
    let record = directory.get_room(&reserved).await.unwrap();
    assert!(!record.broadcaster_present);
    assert_eq!(record.broadcaster_connection_id, None);
    assert!(!directory.broadcaster_present(&reserved).await);
    assert!(directory.list_rooms().await.is_empty());

    let broadcaster = PeerId::new();
    registry.create_or_get(&reserved, broadcaster);
    registry.create_or_get(&RoomId::from("other"), PeerId::new());

    let rooms = directory.list_rooms().await;
    assert_eq!(rooms.len(), 2);
    assert!(directory.broadcaster_present(&reserved).await);

    let record = directory.get_room(&reserved).await.unwrap();
    assert_eq!(record.broadcaster_connection_id, Some(broadcaster));

    registry.release(&reserved, broadcaster);
    assert_eq!(directory.list_rooms().await.len(), 1);
}

#[tokio::test]
async fn test_room_record_serializes_camel_case() {
    let registry = RoomRegistry::new();
    registry.create_or_get(&RoomId::from("42"), PeerId::new());

    let json = serde_json::to_value(registry.get(&RoomId::from("42")).unwrap()).unwrap();
    assert_eq!(json["id"], "42");
    assert_eq!(json["broadcasterPresent"], true);
    assert!(json.get("broadcasterConnectionId").is_some());
}
