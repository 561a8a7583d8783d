//! Wires a loaded [`SimConfig`] into a running simulation: the world store,
//! reservation service, domain systems, effect dispatcher, and one
//! `ActorHost` per configured actor.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use goap_actor::{ActorHost, ActorHostConfig};
use goap_clock::{Calendar, Clock, SimClock};
use goap_domains::{
    AnimalSystem, CalendarSystem, CropSystem, CurrencySystem, FishingSystem, ForagingSystem,
    InventorySystem, MiningSystem, QuestSystem, ShopSystem, SkillSystem, SocialSystem, WeatherKind,
    WeatherSystem,
};
use goap_effects::{DomainRegistry, EffectDispatcher};
use goap_logging::{PerActorLogger, WorldLogger};
use goap_persistence::{SaveArchive, SaveBundle};
use goap_plan::{Executor, ExecutorRegistry, Planner};
use goap_reservations::ReservationService;
use goap_store::{WorldStore, WorldStoreConfig};
use goap_types::EntityId;
use tracing::info;

use crate::config::SimConfig;
use crate::demo_planner::{IdleExecutorRegistry, IdlePlanner};
use crate::error::SimError;

/// How often the bootstrap's game thread calls `tick()` on domain systems
/// that advance with time (weather, calendar, resource respawns).
const DOMAIN_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// How often the main loop polls the shutdown bound while otherwise idle.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A fully wired, runnable simulation.
pub struct Simulation {
    config: SimConfig,
    clock: Arc<dyn Clock>,
    world: Arc<WorldStore>,
    reservations: Arc<ReservationService>,
    inventory: Option<Arc<InventorySystem>>,
    currency: Option<Arc<CurrencySystem>>,
    shops: Option<Arc<ShopSystem>>,
    social: Option<Arc<SocialSystem>>,
    skills: Option<Arc<SkillSystem>>,
    quests: Option<Arc<QuestSystem>>,
    crops: Option<Arc<CropSystem>>,
    animals: Option<Arc<AnimalSystem>>,
    mining: Option<Arc<MiningSystem>>,
    fishing: Option<Arc<FishingSystem>>,
    foraging: Option<Arc<ForagingSystem>>,
    weather: Option<Arc<WeatherSystem>>,
    calendar: Option<Arc<CalendarSystem>>,
    actor_hosts: Vec<Arc<ActorHost>>,
    stop_flag: Arc<AtomicBool>,
}

impl Simulation {
    /// Build every collaborator named in `config`, loading a save archive
    /// first if `persistence.load_path` names one that exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the world store, any log file, or the save
    /// archive fails to open.
    #[allow(clippy::too_many_lines)]
    pub fn bootstrap(config: SimConfig) -> Result<Self, SimError> {
        let calendar_clock = Calendar::default();
        let clock: Arc<dyn Clock> = Arc::new(SimClock::new(config.world.time_scale, calendar_clock));

        let world = Arc::new(WorldStore::new(
            WorldStoreConfig {
                width: config.world.width,
                height: config.world.height,
                shard_count: config.world.shard_count,
                walkable_override: None,
            },
            Arc::clone(&clock),
        )?);
        let reservations = Arc::new(ReservationService::new());

        let inventory = config.domains.inventory.then(|| Arc::new(InventorySystem::default()));
        let currency = config.domains.currency.then(|| Arc::new(CurrencySystem::default()));
        let shops = (!config.domains.shops.is_empty()).then(|| {
            let shops = Arc::new(ShopSystem::default());
            for (shop_id, listing) in &config.domains.shops {
                shops.set_listing(&EntityId::from(shop_id.as_str()), listing.clone());
            }
            shops
        });
        let social = config.domains.social.clone().map(|table| Arc::new(SocialSystem::new(table)));
        let skills = config.domains.skills.then(|| Arc::new(SkillSystem::default()));
        let quests = (!config.domains.quests.is_empty())
            .then(|| Arc::new(QuestSystem::new(config.domains.quests.clone())));
        let calendar =
            (!config.domains.calendar.is_empty()).then(|| Arc::new(CalendarSystem::new(config.domains.calendar.clone())));
        let weather = config
            .domains
            .weather
            .clone()
            .map(|file| Arc::new(WeatherSystem::new(file.into(), config.actors.rng_seed_base)));
        let crops = config
            .domains
            .crops
            .clone()
            .map(|file| Arc::new(CropSystem::new(file.into(), config.actors.rng_seed_base)));
        let animals = config
            .domains
            .animals
            .clone()
            .map(|file| Arc::new(AnimalSystem::new(file.into(), config.actors.rng_seed_base)));
        let mining = config
            .domains
            .mining
            .clone()
            .map(|file| Arc::new(MiningSystem::new(file.into(), config.actors.rng_seed_base)));
        let fishing = config
            .domains
            .fishing
            .clone()
            .map(|file| Arc::new(FishingSystem::new(file.into(), config.actors.rng_seed_base)));
        let foraging = config
            .domains
            .foraging
            .clone()
            .map(|file| Arc::new(ForagingSystem::new(file.into(), config.actors.rng_seed_base)));

        let world_log = Arc::new(WorldLogger::open(
            Path::new(&config.logging.log_dir).join("world.log"),
            config.logging.max_bytes,
        )?);
        let domain_registry = DomainRegistry {
            inventory: inventory.clone(),
            currency: currency.clone(),
            shops: shops.clone(),
            social: social.clone(),
            skills: skills.clone(),
            quests: quests.clone(),
            crops: crops.clone(),
            animals: animals.clone(),
            mining: mining.clone(),
            fishing: fishing.clone(),
            foraging: foraging.clone(),
        };
        let effects = Arc::new(EffectDispatcher::new(domain_registry, Arc::clone(&world_log)));

        let planner: Arc<dyn Planner> = Arc::new(IdlePlanner::new(1.0));
        let executors: Arc<dyn ExecutorRegistry> = Arc::new(IdleExecutorRegistry::default());

        let mut actor_hosts = Vec::with_capacity(config.actors.ids.len());
        for (index, actor_id) in config.actors.ids.iter().enumerate() {
            let self_id = EntityId::from(actor_id.as_str());
            let per_actor_log =
                Arc::new(PerActorLogger::open(&config.logging.log_dir, actor_id.clone(), config.logging.max_bytes)?);
            let rng_seed = config.actors.rng_seed_base.wrapping_add(index as u64);
            let host = Arc::new(ActorHost::new(
                self_id,
                Arc::clone(&world),
                Arc::clone(&planner),
                Arc::clone(&executors),
                Arc::clone(&reservations),
                Arc::clone(&effects),
                None,
                per_actor_log,
                ActorHostConfig { loop_frequency_hz: config.actors.loop_frequency_hz, rng_seed },
            ));
            actor_hosts.push(host);
        }

        let mut sim = Self {
            config,
            clock,
            world,
            reservations,
            inventory,
            currency,
            shops,
            social,
            skills,
            quests,
            crops,
            animals,
            mining,
            fishing,
            foraging,
            weather,
            calendar,
            actor_hosts,
            stop_flag: Arc::new(AtomicBool::new(false)),
        };
        sim.load_if_configured()?;
        Ok(sim)
    }

    fn load_if_configured(&mut self) -> Result<(), SimError> {
        let Some(load_path) = self.config.persistence.load_path.clone() else { return Ok(()) };
        if !Path::new(&load_path).exists() {
            info!(path = %load_path, "no save archive found, starting fresh");
            return Ok(());
        }
        let (manifest, bundle) = SaveArchive::read(&load_path)?;
        info!(path = %load_path, tick = manifest.tick, "loaded save archive");
        self.apply_bundle(bundle)?;
        Ok(())
    }

    fn apply_bundle(&mut self, bundle: SaveBundle) -> Result<(), SimError> {
        if let Some(world_chunk) = bundle.world {
            self.world.apply_state(world_chunk)?;
        }
        if let Some(time) = bundle.clock {
            self.clock.apply_snapshot(time);
        }
        if let Some(tokens) = bundle.reservations {
            self.reservations.apply_state(tokens);
        }
        if let (Some(system), Some(records)) = (&self.inventory, bundle.inventory) {
            system.apply_state(records);
        }
        if let (Some(system), Some(records)) = (&self.currency, bundle.currency) {
            system.apply_state(records);
        }
        if let (Some(system), Some(records)) = (&self.shops, bundle.shops) {
            system.apply_state(records);
        }
        if let (Some(system), Some(state)) = (&self.crops, bundle.crops) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.animals, bundle.animals) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.mining, bundle.mining) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.fishing, bundle.fishing) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.foraging, bundle.foraging) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.weather, bundle.weather) {
            system.apply_state(state);
        }
        if let (Some(system), Some(state)) = (&self.calendar, bundle.calendar) {
            system.apply_state(state);
        }
        if let (Some(system), Some(records)) = (&self.skills, bundle.skills) {
            system.apply_state(records);
        }
        if let (Some(system), Some(records)) = (&self.social, bundle.social) {
            system.apply_state(records);
        }
        if let Some(chunks) = bundle.actors {
            for chunk in chunks {
                if let Some(host) = self.actor_hosts.iter().find(|h| h.status().actor_id == chunk.actor_id) {
                    host.apply_state(chunk);
                }
            }
        }
        Ok(())
    }

    fn capture_bundle(&self) -> SaveBundle {
        SaveBundle {
            world: Some(self.world.capture_state()),
            clock: Some(self.clock.snapshot()),
            reservations: Some(self.reservations.capture_state()),
            inventory: self.inventory.as_ref().map(|s| s.capture_state()),
            currency: self.currency.as_ref().map(|s| s.capture_state()),
            shops: self.shops.as_ref().map(|s| s.capture_state()),
            crops: self.crops.as_ref().map(|s| s.capture_state()),
            animals: self.animals.as_ref().map(|s| s.capture_state()),
            mining: self.mining.as_ref().map(|s| s.capture_state()),
            fishing: self.fishing.as_ref().map(|s| s.capture_state()),
            foraging: self.foraging.as_ref().map(|s| s.capture_state()),
            weather: self.weather.as_ref().map(|s| s.capture_state()),
            calendar: self.calendar.as_ref().map(|s| s.capture_state()),
            skills: self.skills.as_ref().map(|s| s.capture_state()),
            social: self.social.as_ref().map(|s| s.capture_state()),
            quests: self.quests.as_ref().map(|s| s.capture_state()),
            actors: Some(self.actor_hosts.iter().map(|h| h.capture_state()).collect()),
        }
    }

    /// Start every actor host and the domain-tick loop, then block until
    /// `simulation.max_real_time_seconds` elapses (or forever, if unset).
    /// On return, every host has been stopped and, if `persistence.
    /// save_path` is set, a save archive has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if an actor host's thread panicked, or if writing
    /// the save archive fails.
    #[allow(clippy::too_many_lines)]
    pub fn run(self) -> Result<(), SimError> {
        for host in &self.actor_hosts {
            host.start();
        }
        info!(actor_count = self.actor_hosts.len(), "actor hosts started");

        let tick_stop = Arc::clone(&self.stop_flag);
        let tick_clock = Arc::clone(&self.clock);
        let tick_calendar = self.calendar.clone();
        let tick_weather = self.weather.clone();
        let tick_crops = self.crops.clone();
        let tick_animals = self.animals.clone();
        let tick_mining = self.mining.clone();
        let tick_fishing = self.fishing.clone();
        let tick_foraging = self.foraging.clone();
        let tick_thread = thread::spawn(move || {
            while !tick_stop.load(Ordering::Relaxed) {
                let world_time = tick_clock.snapshot();
                if let Some(system) = &tick_calendar {
                    system.tick(&world_time);
                }
                if let Some(system) = &tick_weather {
                    system.tick(&world_time);
                }
                let current_weather =
                    tick_weather.as_ref().map_or(WeatherKind::Clear, |system| system.current());
                if let Some(system) = &tick_crops {
                    system.tick(&world_time, current_weather);
                }
                if let Some(system) = &tick_animals {
                    system.tick(&world_time, current_weather);
                }
                if let Some(system) = &tick_mining {
                    system.tick(&world_time, current_weather);
                }
                if let Some(system) = &tick_fishing {
                    system.tick(&world_time, current_weather);
                }
                if let Some(system) = &tick_foraging {
                    system.tick(&world_time, current_weather);
                }
                thread::sleep(DOMAIN_TICK_INTERVAL);
            }
        });

        let started = Instant::now();
        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                break;
            }
            if let Some(bound) = self.config.simulation.max_real_time_seconds {
                if started.elapsed().as_secs_f64() >= bound {
                    info!(elapsed_seconds = started.elapsed().as_secs_f64(), "run bound reached, shutting down");
                    break;
                }
            }
            thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }

        self.stop_flag.store(true, Ordering::Relaxed);
        for host in &self.actor_hosts {
            host.request_stop();
        }
        for host in &self.actor_hosts {
            host.finish_stop()?;
        }
        if tick_thread.join().is_err() {
            tracing::warn!("domain tick thread panicked");
        }
        info!("all actor hosts stopped");

        if let Some(save_path) = self.config.persistence.save_path.clone() {
            let bundle = self.capture_bundle();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let tick = self.clock.snapshot().total_world_seconds.round() as u64;
            SaveArchive::write(&save_path, &bundle, tick)?;
            info!(path = %save_path, tick, "save archive written");
        }
        Ok(())
    }
}
