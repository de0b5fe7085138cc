use crate::disposer::DisposeStage;
use crate::state::TriggerConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TriggerKind {
    Viewport,
    Interaction,
    Delay,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 3] = [TriggerKind::Viewport, TriggerKind::Interaction, TriggerKind::Delay];

    /// Source name passed to `trigger_load` when this trigger fires.
    pub fn source_name(self) -> &'static str {
        match self {
            TriggerKind::Viewport => "viewport",
            TriggerKind::Interaction => "interaction",
            TriggerKind::Delay => "delay",
        }
    }

    /// Teardown stage in which an armed source of this kind is disarmed.
    pub fn dispose_stage(self) -> DisposeStage {
        match self {
            TriggerKind::Viewport => DisposeStage::DisconnectObserver,
            TriggerKind::Delay => DisposeStage::ClearTimers,
            TriggerKind::Interaction => DisposeStage::RemoveListeners,
        }
    }

    /// Kinds enabled by `config`, in arming order.
    pub fn enabled_by(config: &TriggerConfig) -> Vec<TriggerKind> {
        if config.manual_only || config.immediate {
            return Vec::new();
        }
        let mut kinds = Vec::new();
        if config.viewport_enabled {
            kinds.push(TriggerKind::Viewport);
        }
        if config.interaction_enabled {
            kinds.push(TriggerKind::Interaction);
        }
        if config.delay_enabled {
            kinds.push(TriggerKind::Delay);
        }
        kinds
    }
}

/// A trigger source wired into the environment: an observer, a listener set
/// or a timer. Disarming must be idempotent and must guarantee the source
/// never fires afterwards.
pub trait ArmedTrigger {
    fn kind(&self) -> TriggerKind;

    fn disarm(&mut self);
}

/// Wires trigger sources. Each armed source reports back by calling
/// `trigger_load(kind.source_name())` on the controller.
pub trait TriggerHost {
    fn arm(&self, kind: TriggerKind, config: &TriggerConfig) -> Option<Box<dyn ArmedTrigger>>;
}
