//! Ground-truth physical model of the simulated vehicle.
//!
//! The plant owns three quantities: road speed, engine speed and coolant
//! temperature. Every write path clamps into the physical ranges below, so
//! no caller can drive the model into an impossible state.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

pub const SPEED_MIN_KPH: f32 = 0.0;
pub const SPEED_MAX_KPH: f32 = 200.0;
pub const RPM_MIN: u16 = 600;
pub const RPM_MAX: u16 = 6000;
pub const TEMP_MIN_C: f32 = 20.0;
pub const TEMP_MAX_C: f32 = 110.0;

pub const IDLE_SPEED_KPH: f32 = 0.0;
pub const IDLE_RPM: u16 = 800;
pub const COLD_START_TEMP_C: f32 = 30.0;

// Coast-down keeps 98% of the speed each step.
const SPEED_RETENTION: f32 = 0.98;
const RPM_BASE: f32 = 800.0;
const RPM_PER_KPH: f32 = 50.0;
const RPM_LAG_GAIN: f32 = 0.3;
const WARMUP_RPM_THRESHOLD: u16 = 1000;
const WARMUP_TARGET_C: f32 = 90.0;
const WARMUP_GAIN: f32 = 0.05;
const IDLE_COOLING_C: f32 = 0.01;

/// Clamp that also maps NaN onto the lower bound.
fn clamp_f32(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub speed_kph: f32,
    pub engine_rpm: u16,
    pub coolant_temp_c: f32,
}

impl VehicleState {
    /// Engine on, parked, cold.
    pub fn new() -> Self {
        Self {
            speed_kph: IDLE_SPEED_KPH,
            engine_rpm: IDLE_RPM,
            coolant_temp_c: COLD_START_TEMP_C,
        }
    }

    /// Advance the model by one step. Non-positive (or NaN) `dt_s` leaves
    /// the state untouched.
    ///
    /// Speed decays first, because the engine-speed target is derived from
    /// the decayed speed. Engine speed then closes 30% of the gap to its
    /// target, and the coolant warms toward 90 °C while the engine is above
    /// 1000 rpm, otherwise it cools slowly.
    pub fn step(&mut self, dt_s: f32) {
        if dt_s.is_nan() || dt_s <= 0.0 {
            return;
        }

        self.speed_kph = clamp_f32(self.speed_kph * SPEED_RETENTION, SPEED_MIN_KPH, SPEED_MAX_KPH);

        let target_rpm = RPM_BASE + self.speed_kph * RPM_PER_KPH;
        let correction = ((target_rpm - f32::from(self.engine_rpm)) * RPM_LAG_GAIN).trunc() as i32;
        let rpm = i32::from(self.engine_rpm) + correction;
        self.engine_rpm = rpm.clamp(i32::from(RPM_MIN), i32::from(RPM_MAX)) as u16;

        if self.engine_rpm > WARMUP_RPM_THRESHOLD {
            self.coolant_temp_c += (WARMUP_TARGET_C - self.coolant_temp_c) * WARMUP_GAIN;
        } else {
            self.coolant_temp_c -= IDLE_COOLING_C;
        }
        self.coolant_temp_c = clamp_f32(self.coolant_temp_c, TEMP_MIN_C, TEMP_MAX_C);
    }

    /// Set road speed directly. Engine speed and temperature are untouched.
    pub fn set_target_speed(&mut self, speed_kph: f32) {
        self.speed_kph = clamp_f32(speed_kph, SPEED_MIN_KPH, SPEED_MAX_KPH);
    }

    /// Override every quantity at once, bypassing the dynamics. Each input
    /// is clamped into its own range.
    pub fn force(&mut self, speed_kph: f32, engine_rpm: u16, coolant_temp_c: f32) {
        self.speed_kph = clamp_f32(speed_kph, SPEED_MIN_KPH, SPEED_MAX_KPH);
        self.engine_rpm = engine_rpm.clamp(RPM_MIN, RPM_MAX);
        self.coolant_temp_c = clamp_f32(coolant_temp_c, TEMP_MIN_C, TEMP_MAX_C);
    }

    pub fn is_within_limits(&self) -> bool {
        (SPEED_MIN_KPH..=SPEED_MAX_KPH).contains(&self.speed_kph)
            && (RPM_MIN..=RPM_MAX).contains(&self.engine_rpm)
            && (TEMP_MIN_C..=TEMP_MAX_C).contains(&self.coolant_temp_c)
    }
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::new()
    }
}

/// The single plant instance, shared between the stepping task and the
/// terminal. The mutex serializes writers; critical sections are a few
/// arithmetic operations and are never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedVehicle {
    inner: Arc<Mutex<VehicleState>>,
}

impl SharedVehicle {
    pub fn new(state: VehicleState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn snapshot(&self) -> VehicleState {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the state.
    pub fn update<R>(&self, f: impl FnOnce(&mut VehicleState) -> R) -> R {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}
