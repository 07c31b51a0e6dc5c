//! ESP-IDF GPIO adapter: implements the [`DigitalIo`] port with raw
//! `esp_idf_svc::sys` calls.
//!
//! Pin numbers arrive per request, so unlike a fixed board map every pin
//! is configured on demand and returned to reset state by `release`.
//!
//! Edge callbacks go through the per-pin GPIO ISR service.  Each
//! registered callback is boxed and its address handed to the ISR as the
//! handler argument; the box stays in `handlers` until the handler has
//! been removed from the ISR service, so the pointer never dangles.

use core::ffi::c_void;
use std::collections::HashMap;
use std::sync::Mutex;

use esp_idf_svc::sys::*;
use log::{debug, info};

use crate::app::ports::{Bias, DigitalIo, Edge, EdgeCallback, IoError, Level, PinMode};
use crate::pins::{PinId, pin_mask};

/// GPIO access for the whole chip.  Construct once at boot.
pub struct EspGpio {
    handlers: Mutex<HashMap<PinId, Box<EdgeCallback>>>,
}

impl EspGpio {
    /// Install the per-pin GPIO ISR service.
    pub fn new() -> Result<Self, IoError> {
        // SAFETY: ESP_ERR_INVALID_STATE means the service is already
        // installed, which is fine.
        let ret = unsafe { gpio_install_isr_service(0) };
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(IoError::Hardware(ret));
        }
        info!("gpio: ISR service installed");
        Ok(Self {
            handlers: Mutex::new(HashMap::new()),
        })
    }

    fn handlers(&self) -> std::sync::MutexGuard<'_, HashMap<PinId, Box<EdgeCallback>>> {
        self.handlers.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Chip GPIO number for `pin`, rejecting pins the chip does not have.
/// Pin numbers come straight from requests.
fn gpio_num(pin: PinId) -> Result<gpio_num_t, IoError> {
    pin_mask(pin, gpio_num_t_GPIO_NUM_MAX as u32)
        .map(|_| gpio_num_t::from(pin))
        .ok_or(IoError::InvalidPin)
}

fn check(ret: esp_err_t) -> Result<(), IoError> {
    match ret {
        r if r == ESP_OK as i32 => Ok(()),
        r if r == ESP_ERR_INVALID_ARG as i32 => Err(IoError::InvalidPin),
        r if r == ESP_ERR_INVALID_STATE as i32 => Err(IoError::NotConfigured),
        r => Err(IoError::Hardware(r)),
    }
}

unsafe extern "C" fn edge_trampoline(arg: *mut c_void) {
    // SAFETY: `arg` is the address of a `Box<EdgeCallback>` owned by
    // `EspGpio::handlers`, kept alive until after `gpio_isr_handler_remove`.
    let callback = unsafe { &*(arg as *const EdgeCallback) };
    callback();
}

impl DigitalIo for EspGpio {
    fn configure(&self, pin: PinId, mode: PinMode, bias: Bias) -> Result<(), IoError> {
        let mask = pin_mask(pin, gpio_num_t_GPIO_NUM_MAX as u32).ok_or(IoError::InvalidPin)?;
        let cfg = gpio_config_t {
            pin_bit_mask: mask,
            mode: match mode {
                PinMode::Input => gpio_mode_t_GPIO_MODE_INPUT,
                PinMode::Output => gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
            },
            pull_up_en: match bias {
                Bias::PullUp => gpio_pullup_t_GPIO_PULLUP_ENABLE,
                Bias::None => gpio_pullup_t_GPIO_PULLUP_DISABLE,
            },
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };
        // SAFETY: gpio_config validates the pin mask and returns
        // ESP_ERR_INVALID_ARG for pins that do not exist.
        check(unsafe { gpio_config(&cfg) })?;
        debug!("gpio {}: {:?} {:?}", pin, mode, bias);
        Ok(())
    }

    fn write(&self, pin: PinId, level: Level) -> Result<(), IoError> {
        let gpio = gpio_num(pin)?;
        let value = u32::from(level == Level::High);
        // SAFETY: register write on a pin configured as output.
        check(unsafe { gpio_set_level(gpio, value) })
    }

    fn read(&self, pin: PinId) -> Result<Level, IoError> {
        let gpio = gpio_num(pin)?;
        // SAFETY: read-only register access.
        let raw = unsafe { gpio_get_level(gpio) };
        Ok(Level::from(raw != 0))
    }

    fn subscribe(&self, pin: PinId, edge: Edge, callback: EdgeCallback) -> Result<(), IoError> {
        let gpio = gpio_num(pin)?;
        let mut handlers = self.handlers();
        if handlers.contains_key(&pin) {
            return Err(IoError::AlreadySubscribed);
        }
        let boxed = Box::new(callback);
        let arg = (&*boxed as *const EdgeCallback).cast_mut().cast::<c_void>();
        let intr = match edge {
            Edge::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
            Edge::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
        };
        // SAFETY: `arg` points into `boxed`, which is stored in `handlers`
        // below and only dropped after the handler is removed.
        unsafe {
            check(gpio_set_intr_type(gpio, intr))?;
            check(gpio_isr_handler_add(gpio, Some(edge_trampoline), arg))?;
            if let Err(e) = check(gpio_intr_enable(gpio)) {
                gpio_isr_handler_remove(gpio);
                return Err(e);
            }
        }
        handlers.insert(pin, boxed);
        debug!("gpio {}: {:?} edge interrupt armed", pin, edge);
        Ok(())
    }

    fn unsubscribe(&self, pin: PinId) -> Result<(), IoError> {
        let gpio = gpio_num(pin)?;
        let mut handlers = self.handlers();
        if !handlers.contains_key(&pin) {
            return Ok(());
        }
        // SAFETY: removes the handler registered in `subscribe`; the boxed
        // callback is dropped only after removal.
        unsafe {
            gpio_intr_disable(gpio);
            check(gpio_isr_handler_remove(gpio))?;
        }
        handlers.remove(&pin);
        debug!("gpio {}: edge interrupt disarmed", pin);
        Ok(())
    }

    fn release(&self, pin: PinId) -> Result<(), IoError> {
        let gpio = gpio_num(pin)?;
        self.unsubscribe(pin)?;
        // SAFETY: gpio_reset_pin returns the pin to its default input,
        // pull-up, interrupt-disabled state.
        check(unsafe { gpio_reset_pin(gpio) })
    }
}
