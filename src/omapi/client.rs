//! OMAPI client (§4.C): TCP handshake against ISC DHCP's OMAPI port,
//! followed by signed `Open`/`Delete` requests.

use std::net::Ipv4Addr;

use mac_address::MacAddress;
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::auth::Authenticator;
use super::message::{Message, Opcode};
use super::wire::{put_bool, put_i32, put_ipv4, FieldMap, HEADER_SIZE, PROTOCOL_VERSION};
use super::OmapiError;

pub struct OmapiClient {
    stream: TcpStream,
    authenticator: Authenticator,
    auth_id: u32,
}

pub struct Host {
    pub hostname: Option<String>,
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
}

impl OmapiClient {
    /// Connects, performs the 8-byte preamble handshake, then the
    /// unsigned authenticator `Open` that yields the `auth_id` handle for
    /// all subsequent signed messages.
    pub async fn connect(
        addr: impl tokio::net::ToSocketAddrs,
        key_name: &str,
        base64_key: &str,
    ) -> Result<Self, OmapiError> {
        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(OmapiError::Io)?;

        let mut preamble = Vec::new();
        put_i32(&mut preamble, PROTOCOL_VERSION as i32);
        put_i32(&mut preamble, HEADER_SIZE as i32);
        stream.write_all(&preamble).await.map_err(OmapiError::Io)?;

        let mut echoed = [0u8; 8];
        stream.read_exact(&mut echoed).await.map_err(OmapiError::Io)?;
        if echoed != preamble.as_slice() {
            return Err(OmapiError::PreambleMismatch);
        }

        let authenticator = Authenticator::new(key_name, base64_key)?;

        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"authenticator".to_vec());
        let mut obj = FieldMap::new();
        obj.insert(
            "algorithm".to_string(),
            Authenticator::ALGORITHM.as_bytes().to_vec(),
        );
        obj.insert("name".to_string(), authenticator.name.as_bytes().to_vec());

        let request = Message {
            auth_id: 0,
            op: Opcode::Open,
            handle: 0,
            tid: fresh_tid(),
            rid: 0,
            msg,
            obj,
            signature: Vec::new(),
        };

        let mut client = Self {
            stream,
            authenticator,
            auth_id: 0,
        };
        let response = client.roundtrip(request).await?;
        if response.op != Opcode::Update {
            return Err(wrong_opcode(&response));
        }
        if response.handle == 0 {
            return Err(OmapiError::ZeroHandle);
        }
        client.auth_id = response.handle;
        Ok(client)
    }

    async fn roundtrip(&mut self, mut request: Message) -> Result<Message, OmapiError> {
        request.auth_id = self.auth_id;
        if self.auth_id != 0 {
            // `signature_len` is inside the signed region (§4.C), so the
            // placeholder must already carry the real signature length
            // before `sign` computes the MAC over it.
            request.signature = vec![0u8; Authenticator::SIGNATURE_LEN];
            request.signature = self.authenticator.sign(&request)?;
        }
        let bytes = request.to_bytes();
        self.stream.write_all(&bytes).await.map_err(OmapiError::Io)?;

        let mut header = [0u8; 24];
        self.stream.read_exact(&mut header).await.map_err(OmapiError::Io)?;
        let signature_len = u32::from_be_bytes(header[4..8].try_into().unwrap()) as usize;

        let mut rest = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let attempt = [header.as_slice(), &rest].concat();
            let body_complete = super::wire::decode_map(&attempt, 24)
                .and_then(|(_, offset)| super::wire::decode_map(&attempt, offset))
                .map(|(_, offset)| attempt.len() >= offset + signature_len)
                .unwrap_or(false);
            if body_complete {
                break;
            }
            let read = self.stream.read(&mut buf).await.map_err(OmapiError::Io)?;
            if read == 0 {
                return Err(OmapiError::Truncated);
            }
            rest.extend_from_slice(&buf[..read]);
        }

        let full = [header.as_slice(), &rest].concat();
        let response = Message::from_bytes(&full)?;
        if self.auth_id != 0 {
            self.authenticator.verify(&response)?;
        }
        if response.op == Opcode::Error {
            return Err(server_error(&response));
        }
        Ok(response)
    }

    /// `AddHost` (§4.C): registers a static host object.
    pub async fn add_host(&mut self, ip: Ipv4Addr, mac: MacAddress) -> Result<(), OmapiError> {
        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"host".to_vec());
        let mut create = Vec::new();
        put_bool(&mut create, true);
        msg.insert("create".to_string(), create.clone());
        msg.insert("exclusive".to_string(), create);

        let mut obj = FieldMap::new();
        obj.insert("hardware-address".to_string(), mac.bytes().to_vec());
        let mut hardware_type = Vec::new();
        put_i32(&mut hardware_type, 1);
        obj.insert("hardware-type".to_string(), hardware_type);
        let mut ip_bytes = Vec::new();
        put_ipv4(&mut ip_bytes, ip);
        obj.insert("ip-address".to_string(), ip_bytes);

        let request = Message {
            auth_id: 0,
            op: Opcode::Open,
            handle: 0,
            tid: fresh_tid(),
            rid: 0,
            msg,
            obj,
            signature: Vec::new(),
        };
        let response = self.roundtrip(request).await?;
        if response.op != Opcode::Update {
            return Err(wrong_opcode(&response));
        }
        Ok(())
    }

    /// `GetHost` (§4.C): looks up a host object by arbitrary `options`.
    pub async fn get_host(&mut self, options: FieldMap) -> Result<Host, OmapiError> {
        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"host".to_vec());

        let request = Message {
            auth_id: 0,
            op: Opcode::Open,
            handle: 0,
            tid: fresh_tid(),
            rid: 0,
            msg,
            obj: options,
            signature: Vec::new(),
        };
        let response = self.roundtrip(request).await?;
        if response.op != Opcode::Update {
            return Err(wrong_opcode(&response));
        }
        host_from_obj(&response.obj)
    }

    /// `DeleteHost` (§4.C): locate by MAC, then delete the located handle.
    pub async fn delete_host(&mut self, mac: MacAddress) -> Result<(), OmapiError> {
        let mut msg = FieldMap::new();
        msg.insert("type".to_string(), b"host".to_vec());
        let mut obj = FieldMap::new();
        obj.insert("hardware-address".to_string(), mac.bytes().to_vec());

        let locate = Message {
            auth_id: 0,
            op: Opcode::Open,
            handle: 0,
            tid: fresh_tid(),
            rid: 0,
            msg,
            obj,
            signature: Vec::new(),
        };
        let located = self.roundtrip(locate).await?;
        if located.op != Opcode::Update {
            return Err(wrong_opcode(&located));
        }
        if located.handle == 0 {
            return Err(OmapiError::ZeroHandle);
        }

        let delete = Message {
            auth_id: 0,
            op: Opcode::Delete,
            handle: located.handle,
            tid: fresh_tid(),
            rid: 0,
            msg: FieldMap::new(),
            obj: FieldMap::new(),
            signature: Vec::new(),
        };
        let response = self.roundtrip(delete).await?;
        if response.op != Opcode::Status {
            return Err(wrong_opcode(&response));
        }
        Ok(())
    }
}

fn host_from_obj(obj: &FieldMap) -> Result<Host, OmapiError> {
    let mac_bytes = obj
        .get("hardware-address")
        .ok_or(OmapiError::MissingField("hardware-address"))?;
    let mac = MacAddress::new(
        mac_bytes
            .get(..6)
            .ok_or(OmapiError::Truncated)?
            .try_into()
            .map_err(|_| OmapiError::Truncated)?,
    );
    let ip_bytes = obj
        .get("ip-address")
        .ok_or(OmapiError::MissingField("ip-address"))?;
    let ip_octets: [u8; 4] = ip_bytes
        .get(..4)
        .ok_or(OmapiError::Truncated)?
        .try_into()
        .map_err(|_| OmapiError::Truncated)?;
    let ip = Ipv4Addr::from(ip_octets);
    let hostname = obj
        .get("name")
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
    Ok(Host { hostname, ip, mac })
}

fn fresh_tid() -> u32 {
    rand::thread_rng().gen_range(1..=u32::MAX)
}

fn wrong_opcode(response: &Message) -> OmapiError {
    OmapiError::WrongOpcode {
        message: server_message(response),
    }
}

fn server_error(response: &Message) -> OmapiError {
    OmapiError::ServerError {
        message: server_message(response),
    }
}

fn server_message(response: &Message) -> Option<String> {
    response
        .msg
        .get("message")
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}
