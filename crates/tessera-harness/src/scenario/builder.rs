//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use std::sync::Arc;

use tessera_core::{
    AeadChannel, AesGcmChannel, InitiatorSession, KdcService, PrincipalRegistry,
    ResponderSession, SessionAction, SessionError,
};
use tessera_proto::{
    Frame, KeyMaterial, Payload, PrincipalId, Record, payloads::challenge::ChallengeResponse,
};

use crate::{
    scenario::{Actor, OracleFn, World},
    sim_env::SimEnv,
};

/// Long-term key of `"A"` in the default registry
pub const KEY_A: [u8; 32] = [0xA1; 32];
/// Long-term key of `"B"` in the default registry
pub const KEY_B: [u8; 16] = [0xB2; 16];

/// A deviation injected into an otherwise honest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The initiator asks for a session with an identity the KDC does not
    /// know (`"Z"`)
    UnknownResponder,
    /// The AuthRequest reaching the KDC carries a different nonce than the
    /// one the initiator remembers, so the reply echoes a stale nonce
    StaleKdcReply,
    /// One bit of the KdcReply ciphertext is flipped in transit
    TamperKdcReply,
    /// One bit of the ticket ciphertext is flipped in transit
    TamperTicket,
    /// The initiator answers the challenge with this value instead of
    /// `N_B - 1`
    WrongChallengeResponse(u64),
}

/// Scenario builder.
///
/// Defaults: principals `A` and `B` with [`KEY_A`] and [`KEY_B`], `A`
/// initiates, `N_A = 7`, `N_B = 42`, seed `0`, no fault.
pub struct Scenario {
    principals: Vec<(PrincipalId, KeyMaterial)>,
    initiator_nonce: u64,
    responder_nonce: u64,
    seed: u64,
    fault: Option<Fault>,
}

impl Scenario {
    /// Create a scenario with the default registry and nonces.
    pub fn new() -> Self {
        Self {
            principals: vec![
                (principal("A"), KeyMaterial::new(KEY_A.to_vec())),
                (principal("B"), KeyMaterial::new(KEY_B.to_vec())),
            ],
            initiator_nonce: 7,
            responder_nonce: 42,
            seed: 0,
            fault: None,
        }
    }

    /// Replace the long-term key of `A` or `B`.
    pub fn with_key(mut self, name: &str, key: Vec<u8>) -> Self {
        let id = principal(name);
        if let Some(entry) = self.principals.iter_mut().find(|(existing, _)| *existing == id) {
            entry.1 = KeyMaterial::new(key);
        }
        self
    }

    /// Pin the initiator's request nonce `N_A`.
    pub fn with_initiator_nonce(mut self, nonce: u64) -> Self {
        self.initiator_nonce = nonce;
        self
    }

    /// Pin the responder's challenge nonce `N_B`.
    pub fn with_responder_nonce(mut self, nonce: u64) -> Self {
        self.responder_nonce = nonce;
        self
    }

    /// Seed the environment that draws session keys and AEAD nonces.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Inject a fault.
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

/// Where a run stopped early.
enum Halt {
    /// An actor raised a protocol error; recorded in the world
    Failed,
    /// The harness itself saw something it cannot drive
    Harness(String),
}

impl From<String> for Halt {
    fn from(message: String) -> Self {
        Self::Harness(message)
    }
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Runs the exchange until it completes or an actor fails, then invokes
    /// the oracle on the resulting world. A protocol failure is not an error
    /// here; the oracle decides whether it was expected.
    ///
    /// # Errors
    ///
    /// Returns the oracle's message, or a description of an action sequence
    /// the harness could not drive.
    pub fn run(self) -> Result<World, String> {
        let scenario = &self.scenario;
        let registry = PrincipalRegistry::new(scenario.principals.clone())
            .map_err(|err| format!("invalid registry: {err}"))?;
        let key_of = |name: &str| {
            registry
                .key(&principal(name))
                .cloned()
                .ok_or_else(|| format!("{name} is not registered"))
        };

        let peer = match scenario.fault {
            Some(Fault::UnknownResponder) => principal("Z"),
            _ => principal("B"),
        };
        let initiator =
            InitiatorSession::new(principal("A"), peer, key_of("A")?, scenario.initiator_nonce);
        let responder =
            ResponderSession::new(principal("B"), key_of("B")?, scenario.responder_nonce);

        let env = SimEnv::with_seed(scenario.seed);
        let aead = AesGcmChannel::new(env.clone());
        let kdc = KdcService::new(Arc::new(registry));

        let mut world = World::new(initiator, responder);
        let exchange =
            Exchange { fault: scenario.fault.as_ref(), kdc: &kdc, env: &env, aead: &aead };

        match exchange.drive(&mut world) {
            Ok(()) | Err(Halt::Failed) => {},
            Err(Halt::Harness(message)) => return Err(message),
        }

        (self.oracle)(&world)?;
        Ok(world)
    }
}

/// One pass through the five messages.
struct Exchange<'a> {
    fault: Option<&'a Fault>,
    kdc: &'a KdcService,
    env: &'a SimEnv,
    aead: &'a AesGcmChannel<SimEnv>,
}

impl Exchange<'_> {
    fn drive(&self, world: &mut World) -> Result<(), Halt> {
        // 1. A -> KDC
        let actions = world.initiator_mut().start();
        let mut request = self.step(world, Actor::Initiator, actions)?;
        if self.fault == Some(&Fault::StaleKdcReply) {
            request = self.bump_nonce(&request)?;
        }

        // 2. KDC -> A
        let actions = self.kdc.handle_frame(&request, self.env, self.aead);
        let mut reply = self.step(world, Actor::Kdc, actions)?;
        if self.fault == Some(&Fault::TamperKdcReply) {
            reply = flip_bit(&reply);
        }

        // 3. A -> B
        let actions = world.initiator_mut().handle_kdc_reply(&reply, self.aead);
        let mut ticket = self.step(world, Actor::Initiator, actions)?;
        if self.fault == Some(&Fault::TamperTicket) {
            ticket = flip_bit(&ticket);
        }

        // 4. B -> A
        let actions = world.responder_mut().handle_frame(&ticket, self.aead);
        let challenge = self.step(world, Actor::Responder, actions)?;

        // 5. A -> B
        let answer = match self.fault {
            Some(Fault::WrongChallengeResponse(value)) => self.forge_answer(world, *value)?,
            _ => {
                let actions = world.initiator_mut().handle_challenge(&challenge, self.aead);
                self.step(world, Actor::Initiator, actions)?
            },
        };

        let actions = world.responder_mut().handle_frame(&answer, self.aead);
        match self.apply(world, Actor::Responder, actions)? {
            None => Ok(()),
            Some(_) => Err(Halt::Harness("responder sent a frame after the answer".to_string())),
        }
    }

    /// Apply one actor's actions and return the single frame it sent.
    fn step(
        &self,
        world: &mut World,
        actor: Actor,
        actions: Result<Vec<SessionAction>, SessionError>,
    ) -> Result<Frame, Halt> {
        self.apply(world, actor, actions)?
            .ok_or_else(|| Halt::Harness(format!("{actor} sent nothing")))
    }

    fn apply(
        &self,
        world: &mut World,
        actor: Actor,
        actions: Result<Vec<SessionAction>, SessionError>,
    ) -> Result<Option<Frame>, Halt> {
        let actions = match actions {
            Ok(actions) => actions,
            Err(error) => {
                world.record_error(actor, error);
                return Err(Halt::Failed);
            },
        };

        let mut sent = None;
        for action in actions {
            match action {
                SessionAction::SendFrame(frame) => {
                    if sent.is_some() {
                        return Err(Halt::Harness(format!("{actor} sent two frames in one step")));
                    }
                    world.record_frame(actor, frame.clone());
                    sent = Some(frame);
                },
                SessionAction::Established { session_key, .. } => {
                    world.record_established(actor, session_key)?;
                },
                SessionAction::Close { .. } => {},
            }
        }
        Ok(sent)
    }

    fn bump_nonce(&self, request: &Frame) -> Result<Frame, Halt> {
        let forged = match Payload::from_frame(request) {
            Ok(Payload::AuthRequest(mut body)) => {
                body.nonce = body.nonce.wrapping_add(1);
                Payload::AuthRequest(body)
            },
            _ => return Err(Halt::Harness("first frame is not an AuthRequest".to_string())),
        };
        forged.into_frame().map_err(|err| Halt::Harness(err.to_string()))
    }

    /// Answer the challenge with `value`, sealed under the initiator's
    /// session key, without advancing the initiator.
    fn forge_answer(&self, world: &mut World, value: u64) -> Result<Frame, Halt> {
        let key = world
            .initiator()
            .session_key()
            .ok_or_else(|| Halt::Harness("initiator holds no session key".to_string()))?;

        let plaintext = ChallengeResponse { value }
            .to_bytes()
            .map_err(|err| Halt::Harness(err.to_string()))?;
        let sealed = self
            .aead
            .encrypt(&plaintext, key.as_bytes())
            .map_err(|err| Halt::Harness(err.to_string()))?;
        let frame = Payload::ChallengeResponse(sealed.into())
            .into_frame()
            .map_err(|err| Halt::Harness(err.to_string()))?;

        world.record_frame(Actor::Initiator, frame.clone());
        Ok(frame)
    }
}

/// Flip the low bit of the last payload byte (inside the AEAD tag).
fn flip_bit(frame: &Frame) -> Frame {
    let mut payload = frame.payload.to_vec();
    if let Some(last) = payload.last_mut() {
        *last ^= 0x01;
    }
    Frame::new(frame.header, payload)
}

fn principal(name: &str) -> PrincipalId {
    PrincipalId::new(name).unwrap_or_else(|err| unreachable!("fixed name {name:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        let _scenario = Scenario::new().oracle(Box::new(|_world| Ok(())));
    }

    #[test]
    fn honest_run_records_five_frames() {
        let world = Scenario::new().oracle(Box::new(|_world| Ok(()))).run().unwrap();

        assert_eq!(world.frames().len(), 5);
        assert_eq!(world.frames_sent(Actor::Initiator), 3);
        assert_eq!(world.frames_sent(Actor::Kdc), 1);
        assert_eq!(world.frames_sent(Actor::Responder), 1);
    }

    #[test]
    fn oracle_failure_is_reported() {
        let result = Scenario::new().oracle(Box::new(|_world| Err("nope".to_string()))).run();
        assert_eq!(result.err(), Some("nope".to_string()));
    }

    #[test]
    fn bit_flip_changes_one_byte() {
        let frame = Frame::new(
            tessera_proto::FrameHeader::new(tessera_proto::Opcode::Ticket),
            vec![0u8; 4],
        );
        assert_eq!(flip_bit(&frame).payload.as_ref(), &[0, 0, 0, 1]);
    }
}
