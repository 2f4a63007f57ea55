//! The dedicated tick thread.
//!
//! [`TickLoop`] owns the [`World`] and every [`Session`]. Each iteration it
//! drains the client event queue, steps the world by the (clamped) wall-clock
//! delta, keeps every client's chunk view current, and sends each player its
//! authoritative state. Nothing else mutates the world.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use voxelcraft_engine::entity::Entity;
use voxelcraft_engine::protocol::messages::{ActionKind, RequestBody, ResponseBody};
use voxelcraft_engine::protocol::{ChunkPayload, ClientMessage, PlayerState, ServerMessage};
use voxelcraft_engine::viewport::{self, Viewport};
use voxelcraft_engine::world::position::ChunkPos;
use voxelcraft_engine::world::{BlockChange, World};

use crate::config::ServerConfig;
use crate::dashboard::{DashboardState, WorldStats};
use crate::event_queue::{ClientEvent, EventQueue, Outbound, SessionId};
use crate::session::{offline_uuid, Session, Sessions};

/// Longest accepted player name, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Tick loop knobs, taken from [`ServerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TickSettings {
    pub render_distance: i32,
    pub max_players: usize,
    pub max_tick_delta: Duration,
    pub tick_sleep: Duration,
    pub autosave: Duration,
}

impl TickSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            render_distance: config.server.render_distance as i32,
            max_players: config.network.max_players,
            max_tick_delta: Duration::from_millis(config.server.max_tick_delta_ms),
            tick_sleep: Duration::from_millis(config.server.tick_sleep_ms),
            autosave: Duration::from_secs(config.server.autosave_secs),
        }
    }
}

pub struct TickLoop {
    world: World,
    sessions: Sessions,
    events: EventQueue,
    dashboard: Arc<DashboardState>,
    settings: TickSettings,
}

impl TickLoop {
    pub fn new(
        world: World,
        events: EventQueue,
        dashboard: Arc<DashboardState>,
        settings: TickSettings,
    ) -> Self {
        Self {
            world,
            sessions: Sessions::new(),
            events,
            dashboard,
            settings,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Tick until `stop` fires (or its sender is dropped), then save and
    /// shut the world down.
    pub fn run(mut self, stop: Receiver<()>) {
        tracing::info!(
            "Tick loop started (render distance {}, autosave every {:?})",
            self.settings.render_distance,
            self.settings.autosave
        );
        let mut last = Instant::now();
        let mut last_save = Instant::now();

        loop {
            match stop.recv_timeout(self.settings.tick_sleep) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let now = Instant::now();
            let elapsed = now - last;
            last = now;
            if elapsed > self.settings.max_tick_delta {
                tracing::debug!(
                    "Tick overran: {:?} since the last one, clamped to {:?}",
                    elapsed,
                    self.settings.max_tick_delta
                );
            }
            self.tick(elapsed.min(self.settings.max_tick_delta).as_secs_f64());

            if last_save.elapsed() >= self.settings.autosave {
                self.autosave();
                last_save = Instant::now();
            }
        }

        self.shutdown();
    }

    /// One server step of `delta` seconds.
    pub fn tick(&mut self, delta: f64) {
        let start = Instant::now();

        for event in self.events.drain() {
            self.handle_event(event);
        }

        self.world.update(delta);
        self.sync_viewports();
        self.send_ready_chunks();

        let tick = self.world.tick_count();
        for session in self.sessions.iter() {
            if let Some(entity) = self.world.entity(&session.player) {
                session.send(ServerMessage::PlayerState(PlayerState::of(entity, tick)));
            }
        }

        self.publish_stats();
        self.dashboard.metrics.record_tick(start.elapsed());
    }

    fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected {
                session,
                name,
                outbound,
            } => self.join(session, name, outbound),
            ClientEvent::Message { session, message } => {
                self.dashboard.metrics.message_received();
                self.handle_message(session, message);
            }
            ClientEvent::Disconnected { session, reason } => self.leave(session, &reason),
        }
    }

    fn handle_message(&mut self, sid: SessionId, message: ClientMessage) {
        let Some(session) = self.sessions.get_mut(sid) else {
            tracing::trace!("Dropping message from unknown session {}", sid);
            return;
        };
        let player = session.player;

        match message {
            ClientMessage::Join { .. } => {
                tracing::debug!("Session {} sent a second Join, ignoring", sid);
            }
            ClientMessage::Input { seq, input } => {
                if !input.is_finite() {
                    tracing::warn!("Session {} sent non-finite input, dropping it", sid);
                    return;
                }
                session.last_input_seq = seq;
                if let Some(control) = self.world.entity_mut(&player).and_then(|e| e.control.as_mut()) {
                    control.input = input;
                }
            }
            ClientMessage::CameraDelta { yaw, pitch } => {
                if !yaw.is_finite() || !pitch.is_finite() {
                    tracing::warn!("Session {} sent a non-finite camera delta, dropping it", sid);
                    return;
                }
                if let Some(entity) = self.world.entity_mut(&player) {
                    entity.transform.rotate(yaw, pitch);
                    entity.dirty = true;
                }
            }
            ClientMessage::SelectHotbar { slot } => {
                if let Some(entity) = self.world.entity_mut(&player) {
                    if let Some(inventory) = entity.inventory.as_mut() {
                        if inventory.select(usize::from(slot)) {
                            entity.dirty = true;
                        }
                    }
                }
            }
            ClientMessage::Action { kind } => {
                let change = match kind {
                    ActionKind::Attack => self.world.break_target(&player),
                    ActionKind::Use => self.world.place_target(&player),
                };
                if let Some(change) = change {
                    self.broadcast_block(change);
                }
            }
            ClientMessage::Request { id, body } => {
                let body = self.respond(body);
                self.sessions.send(sid, ServerMessage::Response { id, body });
            }
            ClientMessage::Leave => self.leave(sid, "left the game"),
        }
    }

    fn respond(&self, body: RequestBody) -> ResponseBody {
        match body {
            RequestBody::Ping => ResponseBody::Pong,
            RequestBody::WorldInfo => ResponseBody::WorldInfo {
                template: self.world.template().name.to_string(),
                seed: self.world.seed(),
                tick: self.world.tick_count(),
                game_time: self.world.game_time(),
                players: self.sessions.len() as u32,
            },
            RequestBody::BlockAt(pos) => {
                let loaded = self
                    .world
                    .chunk(pos.chunk(self.world.dims()))
                    .is_some_and(|c| c.is_ready());
                if !loaded {
                    return ResponseBody::Error(format!("chunk of {:?} is not loaded", pos));
                }
                let state = self.world.get_block(pos);
                match self.world.context().palette().state(state) {
                    Ok(s) => ResponseBody::BlockAt {
                        pos,
                        state,
                        descriptor: s.descriptor(),
                    },
                    Err(e) => ResponseBody::Error(e.to_string()),
                }
            }
        }
    }

    fn broadcast_block(&self, change: BlockChange) {
        self.dashboard.metrics.block_changed();
        let chunk = change.pos.chunk(self.world.dims());
        self.sessions.broadcast_to_viewers(
            chunk,
            &ServerMessage::BlockUpdate {
                pos: change.pos,
                state: change.state,
            },
        );
    }

    // ── Join / leave ────────────────────────────────────────────────

    fn join(&mut self, sid: SessionId, name: String, outbound: Outbound) {
        let rejection = if name.trim().is_empty() {
            Some("name must not be empty".to_string())
        } else if name.chars().count() > MAX_NAME_LEN {
            Some(format!("name is longer than {} characters", MAX_NAME_LEN))
        } else if self.sessions.len() >= self.settings.max_players {
            Some("server is full".to_string())
        } else if self.sessions.by_name(&name).is_some() {
            Some(format!("{} is already connected", name))
        } else {
            None
        };
        if let Some(reason) = rejection {
            tracing::info!("Rejected join of {:?} (session {}): {}", name, sid, reason);
            self.dashboard.metrics.join_rejected();
            let _ = outbound.send(ServerMessage::JoinRejected { reason });
            return;
        }

        let id = offline_uuid(&name);
        let entity = match self.world.load_entity(id) {
            Ok(Some(snapshot)) => {
                tracing::debug!("Restored saved player {}", name);
                Entity::from_snapshot(&snapshot, self.world.context().registry())
            }
            Ok(None) => Entity::player(id, name.clone(), self.world.spawn_point()),
            Err(e) => {
                tracing::warn!("Could not load player {}, starting fresh: {}", name, e);
                Entity::player(id, name.clone(), self.world.spawn_point())
            }
        };
        let position = entity.position();
        self.world.ensure_chunk(entity.chunk_pos(self.world.dims()));
        self.world.spawn_entity(entity);

        let accepted = ServerMessage::JoinAccepted {
            player_id: id,
            spawn: position,
            palette: self.world.context().palette().descriptors(),
            chunk_dims: self.world.dims(),
            ticks_per_second: self.world.template().ticks_per_second,
            render_distance: self.settings.render_distance as u32,
        };
        let session = Session::new(sid, name, id, outbound);
        session.send(accepted);
        tracing::info!(
            "{} joined (session {}) at ({:.1}, {:.1}, {:.1})",
            session.name,
            sid,
            position.x,
            position.y,
            position.z
        );
        self.sessions.insert(session);
        self.dashboard.metrics.player_joined();
    }

    fn leave(&mut self, sid: SessionId, reason: &str) {
        let Some(session) = self.sessions.remove(sid) else {
            return;
        };
        if let Err(e) = self.world.save_entity(&session.player) {
            tracing::error!("Failed to save player {}: {}", session.name, e);
        }
        self.world.remove_entity(&session.player);
        self.dashboard.metrics.player_left();
        tracing::info!("{} left (session {}): {}", session.name, sid, reason);

        if let Some(view) = session.viewport {
            for pos in view.chunks() {
                self.release_chunk(pos, sid);
            }
        }
    }

    // ── Chunk streaming ─────────────────────────────────────────────

    /// Re-center the viewport of every player whose chunk changed and
    /// stream the difference.
    fn sync_viewports(&mut self) {
        let dims = self.world.dims();
        for sid in self.sessions.ids() {
            let Some(session) = self.sessions.get_mut(sid) else {
                continue;
            };
            let Some(center) = self.world.entity(&session.player).map(|e| e.chunk_pos(dims)) else {
                continue;
            };
            if session.viewport.map(|v| v.center) == Some(center) {
                continue;
            }

            let next = match session.viewport {
                Some(view) => view.recentered(center),
                None => Viewport::square(center, self.settings.render_distance),
            };
            let diff = viewport::diff(session.viewport.as_ref(), &next);
            session.viewport = Some(next);
            tracing::trace!(
                "Session {} moved to {:?}: {} to load, {} to unload",
                sid,
                center,
                diff.load.len(),
                diff.unload.len()
            );

            for pos in diff.load {
                let chunk = self.world.request_chunk(pos);
                if chunk.is_ready() {
                    session.send(ServerMessage::ChunkData {
                        pos,
                        payload: ChunkPayload::from_storage(&chunk.storage()),
                    });
                } else {
                    session.pending.insert(pos);
                }
            }
            for pos in &diff.unload {
                session.pending.remove(pos);
                session.send(ServerMessage::UnloadChunk { pos: *pos });
            }
            for pos in diff.unload {
                self.release_chunk(pos, sid);
            }
        }
    }

    /// Unload `pos` once no session but `sid` views it.
    fn release_chunk(&mut self, pos: ChunkPos, sid: SessionId) {
        if self.sessions.viewed_by_others(pos, sid) {
            return;
        }
        if let Err(e) = self.world.unload_chunk(pos) {
            tracing::error!("Failed to save chunk {:?} on unload: {}", pos, e);
        }
    }

    /// Send chunks that finished generating to the sessions waiting on them.
    fn send_ready_chunks(&mut self) {
        for pos in self.world.drain_ready() {
            let waiting: Vec<SessionId> = self
                .sessions
                .iter()
                .filter(|s| s.pending.contains(&pos))
                .map(|s| s.id)
                .collect();
            if waiting.is_empty() {
                continue;
            }
            let Some(chunk) = self.world.chunk(pos) else {
                continue;
            };
            let payload = ChunkPayload::from_storage(&chunk.storage());
            for sid in waiting {
                if let Some(session) = self.sessions.get_mut(sid) {
                    session.pending.remove(&pos);
                    session.send(ServerMessage::ChunkData {
                        pos,
                        payload: payload.clone(),
                    });
                }
            }
        }
    }

    // ── Housekeeping ────────────────────────────────────────────────

    fn publish_stats(&self) {
        self.dashboard.publish_world(WorldStats {
            tick: self.world.tick_count(),
            game_time: self.world.game_time(),
            chunks_loaded: self.world.chunk_count() as u64,
            chunks_generated: self.world.generated_count(),
            chunks_from_store: self.world.loaded_from_store(),
            chunks_unloaded: self.world.unloaded_count(),
            entities: self.world.entity_count() as u64,
        });
    }

    pub fn autosave(&mut self) {
        let start = Instant::now();
        match self.world.flush_dirty() {
            Ok(n) => tracing::info!("Autosave complete: {} chunks ({:.2?})", n, start.elapsed()),
            Err(e) => tracing::error!("Autosave failed: {}", e),
        }
    }

    /// Disconnect everyone, save their players and shut the world down.
    pub fn shutdown(&mut self) {
        tracing::info!("Tick loop stopping, saving world...");
        self.sessions.broadcast(&ServerMessage::Disconnect {
            reason: "server closing".to_string(),
        });
        for session in self.sessions.iter() {
            if let Err(e) = self.world.save_entity(&session.player) {
                tracing::error!("Failed to save player {}: {}", session.name, e);
            }
        }
        match self.world.shutdown() {
            Ok(n) => tracing::info!("Shutdown save complete: {} chunks written", n),
            Err(e) => tracing::error!("Shutdown save failed: {}", e),
        }
    }
}
