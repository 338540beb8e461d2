use crate::error::{Result, TsError};
use crate::ts::adaptation::AdaptationField;
use crate::ts::header::TSHeader;
use crate::ts::packet::{Payload, RawData, TSPacket};
use crate::ts::pat::{PATEntry, PAT};
use crate::ts::pes::{is_valid_stream_id, PESHeader, StreamIdKind, PES};
use crate::ts::pmt::{is_valid_stream_type_id, ElementaryStreamInfo, PMT};
use crate::ts::psi::PSI;
use crate::ts::timestamp::encode_pcr;
use crate::ts::{PID_PAT, TS_PAYLOAD_SIZE};
use bytes::Bytes;
use log::{debug, error, warn};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Sentinel PTS meaning "this access unit carries no timestamp"
pub const NO_PTS: i64 = -1;

/// Capacity of the access-unit input queue
pub const INPUT_QUEUE_CAPACITY: usize = 1024;

/// Immutable description of one elementary stream registered with the muxer.
#[derive(Debug, Clone)]
pub struct StreamMeta {
    /// PID the stream's packets are emitted on (13 bits, nonzero)
    pub pid: u16,
    /// PES stream id
    pub stream_id: u8,
    /// MPEG stream type code for the PMT
    pub stream_type_id: u8,
}

/// One access unit submitted to the muxer.
#[derive(Debug, Clone)]
pub struct StreamPacket {
    /// Target PID
    pub pid: u16,
    /// Presentation timestamp in TS ticks, or [`NO_PTS`]
    pub pts: i64,
    /// True on the first packet of a PES packet
    pub is_head: bool,
    /// Opaque payload bytes
    pub data: Bytes,
}

/// Muxer policy knobs.
#[derive(Debug, Clone)]
pub struct MuxerConfig {
    /// PID the PMT is emitted on; must be nonzero
    pub pmt_pid: u16,
    /// PID carrying the PCR; must be one of the registered stream PIDs
    pub pcr_pid: u16,
    /// Re-emit PAT and PMT once head-unit timestamps advance this far.
    /// `None` emits both exactly once at startup.
    pub psi_interval: Option<Duration>,
}

/// Transport Stream muxer pipeline.
///
/// [`Muxer::run`] validates the stream set, writes PAT and PMT, and spawns
/// the consumer task that owns the sink. Producers feed access units through
/// the channel; per-PID continuity counters and all writes live in the
/// consumer task only.
pub struct Muxer<W: AsyncWrite + Unpin + Send> {
    sink: BufWriter<W>,
    config: MuxerConfig,
    streams: Vec<StreamMeta>,
    counters: HashMap<u16, u8>,
    pat_continuity: u8,
    pmt_continuity: u8,
    last_psi_pts: Option<i64>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> Muxer<W> {
    /// Starts the pipeline.
    ///
    /// Validation and the initial PAT/PMT emission happen before the
    /// consumer task is spawned, so configuration errors surface directly to
    /// the caller. The returned channel yields the consumer's terminal
    /// status: `Ok(())` after a graceful drain or cancellation, `Err` when
    /// the sink failed.
    pub async fn run(
        cancel: CancellationToken,
        sink: W,
        config: MuxerConfig,
        streams: Vec<StreamMeta>,
        input: mpsc::Receiver<StreamPacket>,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        validate(&config, &streams)?;

        let mut muxer = Self {
            sink: BufWriter::new(sink),
            config,
            streams,
            counters: HashMap::new(),
            pat_continuity: 0,
            pmt_continuity: 0,
            last_psi_pts: None,
        };
        muxer.write_psi().await?;

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = muxer.process(cancel, input).await;
            if let Err(err) = &result {
                error!("muxer pipeline terminated: {err}");
            }
            let _ = done_tx.send(result);
        });

        Ok(done_rx)
    }

    async fn process(
        &mut self,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<StreamPacket>,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("muxer cancelled");
                    break;
                }
                unit = input.recv() => match unit {
                    Some(unit) => self.write_access_unit(unit).await?,
                    None => {
                        debug!("muxer input closed, drained");
                        break;
                    }
                }
            }
        }
        self.sink
            .flush()
            .await
            .map_err(|e| TsError::Sink(e.to_string()))
    }

    async fn write_access_unit(&mut self, unit: StreamPacket) -> Result<()> {
        if unit.data.is_empty() {
            warn!("dropping empty access unit on pid {}", unit.pid);
            return Ok(());
        }
        let Some(meta) = self.streams.iter().find(|m| m.pid == unit.pid).cloned() else {
            warn!("dropping access unit on unregistered pid {}", unit.pid);
            return Ok(());
        };

        if unit.is_head {
            self.maybe_reemit_psi(unit.pts).await?;
        }

        let mut counter = self.counters.get(&unit.pid).copied().unwrap_or(0);
        let mut offset = 0;

        if unit.is_head {
            let (packet, consumed) = build_head_packet(&meta, &unit, self.config.pcr_pid, counter)?;
            self.write_packet(&packet.encode()?).await?;
            counter = (counter + 1) & 0x0F;
            offset = consumed;
        }

        while offset < unit.data.len() {
            let end = (offset + TS_PAYLOAD_SIZE).min(unit.data.len());
            let packet = build_data_packet(unit.pid, &unit.data[offset..end], counter)?;
            self.write_packet(&packet.encode()?).await?;
            counter = (counter + 1) & 0x0F;
            offset = end;
        }

        self.counters.insert(unit.pid, counter);
        Ok(())
    }

    async fn maybe_reemit_psi(&mut self, pts: i64) -> Result<()> {
        let Some(interval) = self.config.psi_interval else {
            return Ok(());
        };
        if pts == NO_PTS {
            return Ok(());
        }
        let interval_ticks = interval.as_millis() as i64 * 90;
        match self.last_psi_pts {
            None => self.last_psi_pts = Some(pts),
            Some(last) if pts.saturating_sub(last) >= interval_ticks => {
                self.pat_continuity = (self.pat_continuity + 1) & 0x0F;
                self.pmt_continuity = (self.pmt_continuity + 1) & 0x0F;
                self.write_psi().await?;
                self.last_psi_pts = Some(pts);
            }
            Some(_) => {}
        }
        Ok(())
    }

    async fn write_psi(&mut self) -> Result<()> {
        let pat = TSPacket {
            header: TSHeader {
                payload_unit_start: true,
                pid: PID_PAT,
                adaptation_field_control: 0b01,
                continuity_counter: self.pat_continuity,
                ..Default::default()
            },
            adaptation: None,
            payload: Some(Payload::PSI(PSI::pat(PAT {
                transport_stream_id: 1,
                version: 0,
                current_next: true,
                section_number: 0,
                last_section_number: 0,
                entries: vec![PATEntry {
                    program_number: 1,
                    pid: self.config.pmt_pid,
                }],
            }))),
        };
        self.write_packet(&pat.encode()?).await?;

        let pmt = TSPacket {
            header: TSHeader {
                payload_unit_start: true,
                pid: self.config.pmt_pid,
                adaptation_field_control: 0b01,
                continuity_counter: self.pmt_continuity,
                ..Default::default()
            },
            adaptation: None,
            payload: Some(Payload::PSI(PSI::pmt(PMT {
                program_number: 1,
                version: 0,
                current_next: true,
                section_number: 0,
                last_section_number: 0,
                pcr_pid: self.config.pcr_pid,
                program_descriptors: Vec::new(),
                streams: self
                    .streams
                    .iter()
                    .map(|meta| ElementaryStreamInfo {
                        stream_type: meta.stream_type_id,
                        elementary_pid: meta.pid,
                        descriptors: Vec::new(),
                    })
                    .collect(),
            }))),
        };
        self.write_packet(&pmt.encode()?).await?;

        debug!("emitted PAT and PMT on pid {}", self.config.pmt_pid);
        Ok(())
    }

    async fn write_packet(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink
            .write_all(bytes)
            .await
            .map_err(|e| TsError::Sink(e.to_string()))
    }
}

fn validate(config: &MuxerConfig, streams: &[StreamMeta]) -> Result<()> {
    if config.pmt_pid == 0 {
        return Err(TsError::InvalidPmtPid);
    }
    if streams.is_empty() {
        return Err(TsError::InvalidData("no streams registered".into()));
    }

    let mut seen = HashSet::new();
    for meta in streams {
        if meta.pid == 0 || !seen.insert(meta.pid) {
            return Err(TsError::InvalidPid(meta.pid));
        }
        if !is_valid_stream_id(meta.stream_id) {
            return Err(TsError::InvalidStreamId(meta.stream_id));
        }
        if !is_valid_stream_type_id(meta.stream_type_id) {
            return Err(TsError::InvalidStreamTypeId(meta.stream_type_id));
        }
    }

    if !seen.contains(&config.pcr_pid) {
        return Err(TsError::InvalidPcrPid(config.pcr_pid));
    }
    Ok(())
}

/// Builds the PES-start packet of an access unit and reports how many
/// payload bytes it consumed.
fn build_head_packet(
    meta: &StreamMeta,
    unit: &StreamPacket,
    pcr_pid: u16,
    counter: u8,
) -> Result<(TSPacket, usize)> {
    let has_pts = unit.pts != NO_PTS;

    let mut adaptation = AdaptationField::default();
    if unit.pid == pcr_pid && has_pts {
        let pcr = if unit.pts > 50 {
            ((unit.pts - 50) as u64) << 9
        } else {
            0
        };
        adaptation.pcr = Some(encode_pcr(pcr));
    }

    let pes_header = if has_pts {
        PESHeader::with_pts(unit.pts as u64)
    } else {
        PESHeader::default()
    };
    let pes_overhead = if StreamIdKind::of(meta.stream_id).has_header() {
        6 + pes_header.encoded_len()
    } else {
        6
    };

    let capacity = TS_PAYLOAD_SIZE - adaptation.encoded_len() - pes_overhead;
    let consumed = unit.data.len().min(capacity);
    if consumed < capacity {
        adaptation.pad_to(TS_PAYLOAD_SIZE - pes_overhead - consumed)?;
    }

    let packet = TSPacket {
        header: TSHeader {
            payload_unit_start: true,
            pid: unit.pid,
            adaptation_field_control: 0b11,
            continuity_counter: counter,
            ..Default::default()
        },
        adaptation: Some(adaptation),
        payload: Some(Payload::PES(PES {
            stream_id: meta.stream_id,
            packet_length: 0,
            header: Some(pes_header),
            data: unit.data[..consumed].to_vec(),
        })),
    };
    Ok((packet, consumed))
}

/// Builds a continuation packet; a short final chunk gets adaptation-field
/// stuffing to keep the 188-byte frame.
fn build_data_packet(pid: u16, chunk: &[u8], counter: u8) -> Result<TSPacket> {
    let (control, adaptation) = if chunk.len() < TS_PAYLOAD_SIZE {
        let mut field = AdaptationField::default();
        field.pad_to(TS_PAYLOAD_SIZE - chunk.len())?;
        (0b11, Some(field))
    } else {
        (0b01, None)
    };

    Ok(TSPacket {
        header: TSHeader {
            pid,
            adaptation_field_control: control,
            continuity_counter: counter,
            ..Default::default()
        },
        adaptation,
        payload: Some(Payload::Raw(RawData {
            data: chunk.to_vec(),
        })),
    })
}
