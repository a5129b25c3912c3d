use braid_storage::{DocumentStore, MemoryStore};
use braid_sync::protocol::WireMessage;
use braid_sync::{
    codec, ClientReplica, DocumentSession, Frame, HostConfig, Hub, LocalBus, OperationBus,
};
use braid_types::{DocumentId, SiteId};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn hub(bus: &Arc<LocalBus>, config: HostConfig) -> (Arc<Hub>, Arc<MemoryStore<char>>) {
    let store = Arc::new(MemoryStore::new());
    let hub = Hub::new(SiteId::new(), config, store.clone(), bus.clone());
    (Arc::new(hub), store)
}

async fn connect(session: &DocumentSession) -> ClientReplica {
    let mut client = ClientReplica::new(session.document(), SiteId::new());
    let WireMessage::Join(join) = client.join_message() else {
        unreachable!()
    };
    for reply in session.join(&join).await.unwrap() {
        client.handle(reply).unwrap();
    }
    client
}

async fn send(session: &DocumentSession, client: &ClientReplica, message: WireMessage<char>) {
    let op = message.into_operation().unwrap();
    session.receive(client.site(), op).await.unwrap();
}

/// Polls `session` until it holds `len` live characters.
async fn wait_for_len(session: &DocumentSession, len: usize) {
    for _ in 0..200 {
        if session.value().await.chars().count() == len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document never reached {len} characters: {:?}", session.value().await);
}

#[tokio::test]
async fn open_is_lazy_and_shared() {
    let bus = Arc::new(LocalBus::new(16));
    let (hub, _) = hub(&bus, HostConfig::default());
    let document = DocumentId::new();

    assert!(hub.get(&document).await.is_none());
    assert!(hub.documents().await.is_empty());

    let first = hub.open(document).await.unwrap();
    let second = hub.open(document).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(hub.documents().await, vec![document]);
    assert!(hub.get(&document).await.is_some());

    // The open document listens on the bus.
    assert_eq!(bus.subscriber_count(&document), 1);
}

#[tokio::test]
async fn hosts_sharing_a_bus_converge() {
    let bus = Arc::new(LocalBus::new(64));
    let (hub_a, _) = hub(&bus, HostConfig::default());
    let (hub_b, store_b) = hub(&bus, HostConfig::default());
    let document = DocumentId::new();

    let at_a = hub_a.open(document).await.unwrap();
    let at_b = hub_b.open(document).await.unwrap();

    let mut alice = connect(&at_a).await;
    let mut bob = connect(&at_b).await;

    for c in "hi".chars() {
        let at = alice.value().chars().count();
        let message = alice.insert_at(at, c).unwrap();
        send(&at_a, &alice, message).await;
    }
    let message = bob.insert_at(0, '>').unwrap();
    send(&at_b, &bob, message).await;

    wait_for_len(&at_a, 3).await;
    wait_for_len(&at_b, 3).await;
    assert_eq!(at_a.value().await, at_b.value().await);
    assert_eq!(at_a.vector().await, at_b.vector().await);

    // B logs what it absorbs, so a restart there keeps everything.
    for _ in 0..200 {
        if store_b.operation_count(&document).unwrap() == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let logged = store_b
        .operations_since(&document, &Default::default())
        .unwrap();
    assert_eq!(logged.len(), 3);
}

#[tokio::test]
async fn collection_waits_for_clients_of_other_hosts() {
    let bus = Arc::new(LocalBus::new(64));
    let (hub_a, _) = hub(&bus, HostConfig::default());
    let (hub_b, _) = hub(&bus, HostConfig::default());
    let document = DocumentId::new();

    let at_a = hub_a.open(document).await.unwrap();
    let at_b = hub_b.open(document).await.unwrap();
    let mut alice = connect(&at_a).await;
    let mut bob = connect(&at_b).await;

    let insert = alice.insert_at(0, 'x').unwrap();
    send(&at_a, &alice, insert.clone()).await;
    let delete = alice.delete_at(0).unwrap();
    send(&at_a, &alice, delete.clone()).await;
    at_a.acknowledge(alice.site(), alice.sequence().vector()).await;

    // B reported a horizon when it opened the document.
    for _ in 0..200 {
        if at_a.peer_count().await == 1 && at_b.vector().await == at_a.vector().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(at_a.peer_count().await, 1);

    // Bob has not seen the delete, so neither host may drop 'x'.
    assert_eq!(at_a.collect_garbage().await.unwrap(), 0);
    assert_eq!(at_a.element_count().await, 1);

    bob.handle(insert).unwrap();
    bob.handle(delete).unwrap();
    at_b.acknowledge(bob.site(), bob.sequence().vector()).await;
    assert_eq!(at_b.collect_garbage().await.unwrap(), 1);

    let mut removed = 0;
    for _ in 0..200 {
        removed = at_a.collect_garbage().await.unwrap();
        if removed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(removed, 1);
    assert_eq!(at_a.element_count().await, 0);
}

#[tokio::test]
async fn lagging_host_recovers_missed_operations() {
    let bus = Arc::new(LocalBus::new(8));
    let (hub_a, store_a) = hub(&bus, HostConfig::default());
    let (hub_b, _) = hub(&bus, HostConfig::default());
    let document = DocumentId::new();

    // A already holds ten operations from a remote client.
    let mut remote = ClientReplica::new(document, SiteId::new());
    let mut frames = Vec::new();
    for c in "0123456789".chars() {
        let at = remote.value().chars().count();
        let message = remote.insert_at(at, c).unwrap();
        let op = message.clone().into_operation().unwrap();
        store_a.append_operation(&document, &op).unwrap();
        frames.push(Frame::from(codec::encode(&message).unwrap()));
    }

    let at_a = hub_a.open(document).await.unwrap();
    let at_b = hub_b.open(document).await.unwrap();
    assert_eq!(at_a.value().await, remote.value());

    // One burst overruns the bus, so B misses the first frames.
    for frame in frames {
        bus.publish(&document, frame).await.unwrap();
    }

    for _ in 0..200 {
        if at_b.value().await == remote.value() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(at_b.value().await, remote.value());
    assert_eq!(at_b.vector().await, at_a.vector().await);
}

#[tokio::test]
async fn collect_all_visits_every_document() {
    let bus = Arc::new(LocalBus::new(16));
    let (hub, _) = hub(&bus, HostConfig::default());

    for _ in 0..3 {
        let session = hub.open(DocumentId::new()).await.unwrap();
        let mut client = connect(&session).await;
        let insert = client.insert_at(0, 'x').unwrap();
        send(&session, &client, insert).await;
        let delete = client.delete_at(0).unwrap();
        send(&session, &client, delete).await;
    }

    assert_eq!(hub.collect_all().await, 3);
    assert_eq!(hub.collect_all().await, 0);
}

#[tokio::test(start_paused = true)]
async fn background_collection_runs_on_interval() {
    let bus = Arc::new(LocalBus::new(16));
    let config = HostConfig {
        gc_interval: Duration::from_secs(5),
        ..HostConfig::default()
    };
    let (hub, _) = hub(&bus, config);
    let gc = hub.spawn_gc();

    let session = hub.open(DocumentId::new()).await.unwrap();
    let mut client = connect(&session).await;
    let insert = client.insert_at(0, 'x').unwrap();
    send(&session, &client, insert).await;
    let delete = client.delete_at(0).unwrap();
    send(&session, &client, delete).await;
    assert_eq!(session.element_count().await, 1);

    for _ in 0..100 {
        if session.element_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    assert_eq!(session.element_count().await, 0);

    // The task ends once the hub is gone.
    drop(session);
    drop(hub);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(gc.is_finished());
}
