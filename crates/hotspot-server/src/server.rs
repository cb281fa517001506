//! RADIUS AAA server
//!
//! Three UDP sockets: Authentication, Accounting, and CoA/Disconnect. Each
//! datagram is handled on its own task so Access-Request bursts from many
//! devices never queue behind one another.
//!
//! Two authentication shapes arrive on the auth socket:
//!
//! - `User-Name == Calling-Station-Id`: the device re-authenticating with
//!   its MAC as the shared password (silent re-auth of a known client);
//! - anything else: `User-Name` is a phone number and the password is the
//!   short-lived token minted at credential issuance.
//!
//! Every reply, accept or reject, carries a Message-Authenticator.

use crate::accounting::apply_accounting;
use crate::auth::{AuthEngine, MacAuthStatus};
use crate::cache::CacheBackend;
use crate::config::{Config, ConfigError};
use crate::credentials::CredentialIssuer;
use crate::phone::{mask_mac, normalize_phone};
use crate::repo::IdentityRepository;
use hotspot_proto::attributes::{Attribute, AttributeType, MIKROTIK_GROUP, MIKROTIK_VENDOR_ID};
use hotspot_proto::chap::verify_chap_blob;
use hotspot_proto::message_auth::{sign_reply, verify_request_message_authenticator};
use hotspot_proto::{
    decrypt_user_password, verify_accounting_request_authenticator, Code, Packet, PacketError,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Everything a packet handler needs, shared across tasks
pub struct ServerContext {
    pub config: Arc<Config>,
    pub engine: Arc<AuthEngine>,
    pub repo: Arc<dyn IdentityRepository>,
    pub cache: Arc<dyn CacheBackend>,
}

impl ServerContext {
    pub fn new(
        config: Arc<Config>,
        engine: Arc<AuthEngine>,
        repo: Arc<dyn IdentityRepository>,
        cache: Arc<dyn CacheBackend>,
    ) -> Self {
        ServerContext {
            config,
            engine,
            repo,
            cache,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Service {
    Auth,
    Acct,
    Coa,
}

pub struct RadiusServer {
    ctx: Arc<ServerContext>,
    auth_socket: Arc<UdpSocket>,
    acct_socket: Arc<UdpSocket>,
    coa_socket: Arc<UdpSocket>,
}

impl RadiusServer {
    /// Bind the three service sockets from the configuration
    pub async fn bind(ctx: ServerContext) -> Result<Self, ServerError> {
        let config = &ctx.config;
        let auth_socket = Arc::new(UdpSocket::bind(config.auth_addr()?).await?);
        let acct_socket = Arc::new(UdpSocket::bind(config.acct_addr()?).await?);
        let coa_socket = Arc::new(UdpSocket::bind(config.coa_addr()?).await?);

        let (auth, acct, coa) = (
            auth_socket.local_addr()?,
            acct_socket.local_addr()?,
            coa_socket.local_addr()?,
        );
        info!(auth = %auth, acct = %acct, coa = %coa, "RADIUS server listening");

        Ok(RadiusServer {
            ctx: Arc::new(ctx),
            auth_socket,
            acct_socket,
            coa_socket,
        })
    }

    /// Bound authentication address; handy when binding to port 0 in tests
    pub fn auth_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.auth_socket.local_addr()?)
    }

    pub fn acct_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.acct_socket.local_addr()?)
    }

    pub fn coa_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.coa_socket.local_addr()?)
    }

    /// Serve all three sockets until one of the receive loops fails
    pub async fn run(&self) -> Result<(), ServerError> {
        tokio::try_join!(
            Self::serve(Arc::clone(&self.auth_socket), Arc::clone(&self.ctx), Service::Auth),
            Self::serve(Arc::clone(&self.acct_socket), Arc::clone(&self.ctx), Service::Acct),
            Self::serve(Arc::clone(&self.coa_socket), Arc::clone(&self.ctx), Service::Coa),
        )?;
        Ok(())
    }

    async fn serve(
        socket: Arc<UdpSocket>,
        ctx: Arc<ServerContext>,
        service: Service,
    ) -> Result<(), ServerError> {
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];
        loop {
            let (len, addr) = socket.recv_from(&mut buf).await?;
            let data = buf[..len].to_vec();

            let socket = Arc::clone(&socket);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let result = match service {
                    Service::Auth => Self::handle_auth(data, addr, &ctx, &socket).await,
                    Service::Acct => Self::handle_acct(data, addr, &ctx, &socket).await,
                    Service::Coa => Self::handle_coa(data, addr, &ctx, &socket).await,
                };
                if let Err(e) = result {
                    debug!(client = %addr, service = ?service, error = %e, "Dropped packet");
                }
            });
        }
    }

    /// Access-Request handling
    async fn handle_auth(
        data: Vec<u8>,
        addr: SocketAddr,
        ctx: &ServerContext,
        socket: &UdpSocket,
    ) -> Result<(), ServerError> {
        let request = Packet::decode(&data)?;
        if request.code != Code::AccessRequest {
            warn!(code = ?request.code, client = %addr, "Unexpected packet on auth socket");
            return Ok(());
        }

        let secret = ctx.config.secret_for(addr.ip()).to_vec();

        let mut group = None;
        if verify_request_message_authenticator(&data, &secret) {
            group = Self::authorize(&request, &secret, ctx).await;
        } else {
            // Unauthenticated packets never reach account lookups.
            warn!(client = %addr, id = request.identifier, "Message-Authenticator check failed");
        }

        let code = if group.is_some() {
            Code::AccessAccept
        } else {
            Code::AccessReject
        };
        let mut reply = Packet::new(code, request.identifier, [0u8; 16]);
        if let Some(group) = group {
            reply.add_attribute(Attribute::vendor(
                MIKROTIK_VENDOR_ID,
                MIKROTIK_GROUP,
                group.as_bytes(),
            )?);
        }
        sign_reply(&mut reply, &request.authenticator, &secret)?;
        socket.send_to(&reply.encode()?, addr).await?;

        debug!(client = %addr, id = request.identifier, code = ?code, "Sent auth reply");
        Ok(())
    }

    /// The accept/reject decision; `Some(group)` means accept
    async fn authorize(
        request: &Packet,
        secret: &[u8],
        ctx: &ServerContext,
    ) -> Option<&'static str> {
        let mac = request.find_string(AttributeType::CallingStationId as u8)?;
        let username = request.find_string(AttributeType::UserName as u8)?;

        if username == mac {
            // device re-auth: the MAC itself is the shared password
            if !Self::verify_password(request, secret, &mac) {
                info!(mac = %mask_mac(&mac), "MAC re-auth credential check failed");
                return None;
            }
            match ctx.engine.authenticate_by_mac(&mac, None).await {
                Ok(MacAuthStatus::Ok(client)) => {
                    info!(mac = %mask_mac(&mac), "Accepted by MAC");
                    Some(group_for(client.employee))
                }
                Ok(status) => {
                    info!(mac = %mask_mac(&mac), status = ?status, "Rejected by MAC");
                    None
                }
                Err(e) => {
                    warn!(mac = %mask_mac(&mac), error = %e, "MAC authentication errored");
                    None
                }
            }
        } else {
            // phone-token path: the password is the cached issuance token
            let phone = normalize_phone(&username);
            let token = match ctx
                .cache
                .get_string(&CredentialIssuer::token_key(&phone))
                .await
            {
                Ok(token) => token.unwrap_or_default(),
                Err(e) => {
                    warn!(error = %e, "Token lookup failed");
                    return None;
                }
            };
            if token.is_empty() || !Self::verify_password(request, secret, &token) {
                info!(phone = %crate::phone::mask_phone(&phone), "Bad or missing token");
                return None;
            }
            match ctx.engine.policy().is_employee(&phone).await {
                Ok(employee) => {
                    info!(phone = %crate::phone::mask_phone(&phone), "Accepted by token");
                    Some(group_for(employee))
                }
                Err(e) => {
                    warn!(error = %e, "Employee classification errored");
                    None
                }
            }
        }
    }

    /// CHAP when present, RFC 2865 User-Password decryption otherwise
    fn verify_password(request: &Packet, secret: &[u8], expected: &str) -> bool {
        if let Some(chap) = request.find_attribute(AttributeType::ChapPassword as u8) {
            let challenge = request
                .find_attribute(AttributeType::ChapChallenge as u8)
                .map(|attr| attr.value.clone())
                .unwrap_or_else(|| request.authenticator.to_vec());
            verify_chap_blob(&chap.value, &challenge, expected)
        } else if let Some(pap) = request.find_attribute(AttributeType::UserPassword as u8) {
            decrypt_user_password(&pap.value, secret, &request.authenticator)
                .map(|password| password == expected)
                .unwrap_or(false)
        } else {
            false
        }
    }

    /// Accounting-Request handling: liveness only, fire-and-forget
    async fn handle_acct(
        data: Vec<u8>,
        addr: SocketAddr,
        ctx: &ServerContext,
        socket: &UdpSocket,
    ) -> Result<(), ServerError> {
        let request = Packet::decode(&data)?;
        if request.code != Code::AccountingRequest {
            warn!(code = ?request.code, client = %addr, "Unexpected packet on acct socket");
            return Ok(());
        }

        let secret = ctx.config.secret_for(addr.ip()).to_vec();
        if !verify_accounting_request_authenticator(&request, &secret) {
            warn!(client = %addr, id = request.identifier, "Accounting authenticator check failed");
            return Ok(());
        }

        // A storage hiccup must not turn into a NAS-visible failure.
        if let Err(e) = apply_accounting(ctx.repo.as_ref(), &request).await {
            warn!(client = %addr, error = %e, "Accounting update failed");
        }

        let mut reply = Packet::new(Code::AccountingResponse, request.identifier, [0u8; 16]);
        sign_reply(&mut reply, &request.authenticator, &secret)?;
        socket.send_to(&reply.encode()?, addr).await?;
        Ok(())
    }

    /// Disconnect/CoA: structurally acknowledged with a NAK, nothing is
    /// disconnected from here
    async fn handle_coa(
        data: Vec<u8>,
        addr: SocketAddr,
        ctx: &ServerContext,
        socket: &UdpSocket,
    ) -> Result<(), ServerError> {
        let request = Packet::decode(&data)?;
        let code = match request.code {
            Code::DisconnectRequest => Code::DisconnectNak,
            Code::CoaRequest => Code::CoaNak,
            other => {
                warn!(code = ?other, client = %addr, "Unexpected packet on CoA socket");
                return Ok(());
            }
        };

        info!(client = %addr, code = ?request.code, "NAKing CoA/Disconnect request");
        let secret = ctx.config.secret_for(addr.ip()).to_vec();
        let mut reply = Packet::new(code, request.identifier, [0u8; 16]);
        sign_reply(&mut reply, &request.authenticator, &secret)?;
        socket.send_to(&reply.encode()?, addr).await?;
        Ok(())
    }
}

fn group_for(employee: bool) -> &'static str {
    if employee {
        "employee"
    } else {
        "guest"
    }
}
