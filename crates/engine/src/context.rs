use edge_ingest_core::{CarLap, MAX_CARS};
use model::{Conditions, Envelope, Event, RivalDirection};

/// Race position -> vehicle slot. Index 0 is never used; positions run 1..=MAX_CARS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIndex {
    slots: [Option<u8>; MAX_CARS + 1],
}

impl Default for GridIndex {
    fn default() -> Self {
        Self { slots: [None; MAX_CARS + 1] }
    }
}

impl GridIndex {
    /// Rebuild from every car's reported position. Position 0 (unset) and anything
    /// beyond the field size are left out.
    pub fn rebuild(&mut self, laps: &[CarLap]) {
        self.slots = [None; MAX_CARS + 1];
        for (idx, lap) in laps.iter().enumerate().take(MAX_CARS) {
            let pos = usize::from(lap.car_position);
            if pos > 0 && pos <= MAX_CARS {
                self.slots[pos] = Some(idx as u8);
            }
        }
    }

    pub fn at(&self, position: usize) -> Option<usize> {
        self.slots.get(position).copied().flatten().map(usize::from)
    }

    pub fn clear(&mut self) {
        self.slots = [None; MAX_CARS + 1];
    }
}

/// All state the engine keeps between ticks. One instance lives for the whole
/// process and is reset in place whenever a new session starts.
#[derive(Debug, Clone)]
pub struct SessionContext {
    base_name: String,
    pub source_port: u16,

    pub session_ordinal: u32,
    pub session_label: String,
    pub last_seen_session_uid: Option<u64>,

    pub max_distance_reached: f64,
    pub held_sector1: f64,
    pub held_sector2: f64,
    pub sector1_sent: bool,
    pub sector2_sent: bool,
    pub last_lap_time_recorded_ms: u32,

    pub last_tyre_wear: Option<[f32; 4]>,
    pub current_speed_ms: f64,

    pub grid: GridIndex,
    pub target_rival_index: Option<usize>,
    pub target_rival_direction: RivalDirection,
    pub target_rival_gap_s: Option<f64>,
    pub last_rival_ers_mode: Option<u8>,

    pub last_conditions: Option<Conditions>,
}

impl SessionContext {
    pub fn new(base_name: impl Into<String>, source_port: u16) -> Self {
        let base_name = base_name.into();
        let session_label = label(&base_name, 1);
        Self {
            base_name,
            source_port,
            session_ordinal: 1,
            session_label,
            last_seen_session_uid: None,
            max_distance_reached: 0.0,
            held_sector1: 0.0,
            held_sector2: 0.0,
            sector1_sent: false,
            sector2_sent: false,
            last_lap_time_recorded_ms: 0,
            last_tyre_wear: None,
            current_speed_ms: 0.0,
            grid: GridIndex::default(),
            target_rival_index: None,
            target_rival_direction: RivalDirection::None,
            target_rival_gap_s: None,
            last_rival_ers_mode: None,
            last_conditions: None,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Bump the ordinal and wipe lap, sector, distance and rival state.
    /// The baseline session uid, the last speed reading and the last published
    /// tyre wear survive.
    pub fn start_new_session(&mut self) {
        self.session_ordinal += 1;
        self.session_label = label(&self.base_name, self.session_ordinal);
        self.max_distance_reached = 0.0;
        self.clear_held_sectors();
        self.last_lap_time_recorded_ms = 0;
        self.grid.clear();
        self.clear_rival();
        self.last_conditions = None;
    }

    pub fn clear_held_sectors(&mut self) {
        self.held_sector1 = 0.0;
        self.held_sector2 = 0.0;
        self.sector1_sent = false;
        self.sector2_sent = false;
    }

    pub fn clear_rival(&mut self) {
        self.target_rival_index = None;
        self.target_rival_direction = RivalDirection::None;
        self.target_rival_gap_s = None;
        self.last_rival_ers_mode = None;
    }

    pub fn envelope(&self, event: Event) -> Envelope {
        Envelope {
            driver_name: self.session_label.clone(),
            source_port: self.source_port,
            event,
        }
    }
}

fn label(base: &str, ordinal: u32) -> String {
    format!("{base}_S{ordinal}")
}
