//! Live rooms keyed by code.
//!
//! The outer map lock is only ever held briefly to look up or insert an
//! entry; each room has its own mutex and all mutations of a room run inside
//! it. Never wait on a room mutex while holding the map lock.
//!
//! Every committed transition also takes the room's delivery turn before the
//! room mutex is released, so whatever the caller sends out for that commit
//! goes out before anything sent for the next one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::store::RoomStore;
use crate::error::{GameError, GameResult};
use crate::room::GameRoom;
use crate::room_code;
use crate::types::*;

struct RoomSlot {
    room: GameRoom,
    /// Set once the room is removed; late lookups of a cloned entry see NotFound
    retired: bool,
}

struct RoomEntry {
    slot: Arc<Mutex<RoomSlot>>,
    /// Held from commit until the commit's deliveries are queued
    delivery: Arc<Mutex<()>>,
    /// Mirrors `room.phase == Ended` so code allocation can skip locking rooms
    ended: AtomicBool,
}

impl RoomEntry {
    fn new(room: GameRoom) -> Arc<Self> {
        let ended = room.phase == Phase::Ended;
        Arc::new(Self {
            slot: Arc::new(Mutex::new(RoomSlot {
                room,
                retired: false,
            })),
            delivery: Arc::new(Mutex::new(())),
            ended: AtomicBool::new(ended),
        })
    }
}

/// Exclusive access to one room, obtained with [`RoomRegistry::lock`]
pub struct RoomGuard {
    code: RoomCode,
    entry: Arc<RoomEntry>,
    slot: OwnedMutexGuard<RoomSlot>,
}

impl RoomGuard {
    pub fn room(&self) -> &GameRoom {
        &self.slot.room
    }
}

/// A committed transition: `f`'s value and the room as committed.
///
/// While this is alive the next transition of the same room cannot commit,
/// so deliveries sent before dropping it reach every connection in commit
/// order.
pub struct Committed<T> {
    pub value: T,
    pub room: GameRoom,
    _turn: OwnedMutexGuard<()>,
}

impl<T> Committed<T> {
    /// Value and room, giving up the delivery turn
    pub fn into_parts(self) -> (T, GameRoom) {
        (self.value, self.room)
    }
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, Arc<RoomEntry>>>,
    store: Arc<dyn RoomStore>,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Load every stored room back into memory. Returns what was restored.
    pub async fn restore(&self) -> GameResult<Vec<GameRoom>> {
        let stored = self
            .store
            .load_all()
            .map_err(|e| GameError::Storage(e.to_string()))?;

        let mut rooms = self.rooms.write().await;
        let mut restored = Vec::new();
        for room in stored {
            if room.is_abandoned() {
                continue;
            }
            rooms.insert(room.code.clone(), RoomEntry::new(room.clone()));
            restored.push(room);
        }
        tracing::info!(count = restored.len(), "Restored rooms from store");
        Ok(restored)
    }

    /// Open a new lobby hosted by `host` under a fresh code.
    ///
    /// The code is reserved under the map lock with the new room already
    /// locked; the store write happens after the map lock is released.
    pub async fn create(&self, host: &str, settings: GameSettings) -> GameResult<GameRoom> {
        let (code, entry, mut slot) = {
            let mut rooms = self.rooms.write().await;
            let code = {
                let mut rng = rand::rng();
                room_code::allocate(&mut rng, |candidate| {
                    rooms
                        .get(candidate)
                        .is_some_and(|entry| !entry.ended.load(Ordering::Acquire))
                })?
            };

            let entry = RoomEntry::new(GameRoom::new(code.clone(), host.to_string(), settings));
            // Nobody else can see this mutex yet
            let slot = entry.slot.clone().lock_owned().await;
            // An ended room under the same code is replaced
            rooms.insert(code.clone(), entry.clone());
            (code, entry, slot)
        };

        if let Err(e) = self.store.save(&slot.room) {
            tracing::warn!(room = %code, "Failed to persist new room: {}", e);
            slot.retired = true;
            drop(slot);
            self.remove_entry(&code, &entry).await;
            return Err(GameError::Storage(e.to_string()));
        }

        tracing::info!(room = %code, host = %host, "Room created");
        Ok(slot.room.clone())
    }

    async fn entry(&self, code: &RoomCode) -> GameResult<Arc<RoomEntry>> {
        self.rooms
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))
    }

    /// Snapshot of a room
    pub async fn get(&self, code: &RoomCode) -> GameResult<GameRoom> {
        let entry = self.entry(code).await?;
        let slot = entry.slot.lock().await;
        if slot.retired {
            return Err(GameError::RoomNotFound(code.clone()));
        }
        Ok(slot.room.clone())
    }

    /// Enter the room's exclusive section. Reads made while holding the
    /// guard stay valid until it is passed to [`apply`](Self::apply) or
    /// dropped.
    pub async fn lock(&self, code: &RoomCode) -> GameResult<RoomGuard> {
        let entry = self.entry(code).await?;
        let slot = entry.slot.clone().lock_owned().await;
        if slot.retired {
            return Err(GameError::RoomNotFound(code.clone()));
        }
        Ok(RoomGuard {
            code: code.clone(),
            entry,
            slot,
        })
    }

    /// Run `f` inside the room's exclusive section.
    ///
    /// `f` works on a draft copy. The draft is only committed once `f`
    /// succeeded and the store accepted it, so any error leaves the room as it
    /// was.
    pub async fn with_room<T, F>(&self, code: &RoomCode, f: F) -> GameResult<Committed<T>>
    where
        F: FnOnce(&mut GameRoom) -> GameResult<T>,
    {
        let guard = self.lock(code).await?;
        self.apply(guard, f).await
    }

    /// Like [`with_room`](Self::with_room) on a room already locked
    pub async fn apply<T, F>(&self, guard: RoomGuard, f: F) -> GameResult<Committed<T>>
    where
        F: FnOnce(&mut GameRoom) -> GameResult<T>,
    {
        let RoomGuard {
            code,
            entry,
            mut slot,
        } = guard;

        let mut draft = slot.room.clone();
        let value = f(&mut draft)?;

        if draft.is_abandoned() {
            slot.retired = true;
            slot.room = draft.clone();
            let turn = entry.delivery.clone().lock_owned().await;
            drop(slot);
            self.remove_entry(&code, &entry).await;
            if let Err(e) = self.store.delete(&code) {
                tracing::warn!(room = %code, "Failed to delete stored room: {}", e);
            }
            tracing::info!(room = %code, "Room deleted after last player left");
            return Ok(Committed {
                value,
                room: draft,
                _turn: turn,
            });
        }

        if let Err(e) = self.store.save(&draft) {
            tracing::warn!(room = %code, "Failed to persist room, transition dropped: {}", e);
            return Err(GameError::Storage(e.to_string()));
        }

        entry
            .ended
            .store(draft.phase == Phase::Ended, Ordering::Release);
        slot.room = draft.clone();
        let turn = entry.delivery.clone().lock_owned().await;
        Ok(Committed {
            value,
            room: draft,
            _turn: turn,
        })
    }

    async fn remove_entry(&self, code: &RoomCode, entry: &Arc<RoomEntry>) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(code).is_some_and(|current| Arc::ptr_eq(current, entry)) {
            rooms.remove(code);
        }
    }

    /// Drop a room regardless of phase
    pub async fn delete(&self, code: &RoomCode) -> GameResult<()> {
        let mut guard = self.lock(code).await?;
        guard.slot.retired = true;
        let RoomGuard { entry, slot, .. } = guard;
        drop(slot);
        self.remove_entry(code, &entry).await;
        self.store
            .delete(code)
            .map_err(|e| GameError::Storage(e.to_string()))?;
        tracing::info!(room = %code, "Room deleted");
        Ok(())
    }

    /// Unfinished rooms `user_id` is seated in
    pub async fn rooms_for_user(&self, user_id: &str) -> Vec<GameRoom> {
        let entries: Vec<Arc<RoomEntry>> = self.rooms.read().await.values().cloned().collect();

        let mut found = Vec::new();
        for entry in entries {
            let slot = entry.slot.lock().await;
            if !slot.retired && slot.room.phase != Phase::Ended && slot.room.player(user_id).is_some()
            {
                found.push(slot.room.clone());
            }
        }
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}
