//! Blocking client
//!
//! A minimal synchronous client for the wire protocol, used by the CLI,
//! the benchmark driver and the tests.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{KvError, Result};
use crate::protocol::{encode_request_into, read_response, write_request, Request, Response};

/// Synchronous connection to a kvstore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| KvError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one request and wait for its response
    pub fn send(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        read_response(&mut self.reader)
    }

    /// Write every request in one burst, then read the responses in order
    pub fn pipeline(&mut self, requests: &[Request]) -> Result<Vec<Response>> {
        let mut batch = Vec::new();
        for request in requests {
            encode_request_into(request, &mut batch);
        }
        self.writer.write_all(&batch)?;
        self.writer.flush()?;

        requests.iter().map(|_| read_response(&mut self.reader)).collect()
    }

    /// Send pre-encoded bytes (possibly malformed) and read one response
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<Response> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        read_response(&mut self.reader)
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<Response> {
        self.send(&Request::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Response> {
        self.send(&Request::Get { key: key.to_vec() })
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<Response> {
        self.send(&Request::Delete { key: key.to_vec() })
    }

    pub fn ping(&mut self) -> Result<Response> {
        self.send(&Request::Ping)
    }
}
