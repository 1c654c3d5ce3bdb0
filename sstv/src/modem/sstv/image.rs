use image::{
    RgbImage,
    imageops::{
        self,
        FilterType,
    },
};

use crate::modem::sstv::modes::ModeSpecification;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    #[default]
    Green,
    Blue,
    Red,
}

impl Channel {
    pub fn next(self) -> Option<Self> {
        match self {
            Channel::Green => Some(Self::Blue),
            Channel::Blue => Some(Self::Red),
            Channel::Red => None,
        }
    }

    #[inline]
    fn rgb_index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

pub trait FrameBuffer {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn channel(&self, x: usize, y: usize, channel: Channel) -> u8;
}

impl<F> FrameBuffer for &F
where
    F: FrameBuffer,
{
    #[inline]
    fn width(&self) -> usize {
        (&**self).width()
    }

    #[inline]
    fn height(&self) -> usize {
        (&**self).height()
    }

    #[inline]
    fn channel(&self, x: usize, y: usize, channel: Channel) -> u8 {
        (&**self).channel(x, y, channel)
    }
}

impl FrameBuffer for RgbImage {
    #[inline]
    fn width(&self) -> usize {
        RgbImage::width(self) as usize
    }

    #[inline]
    fn height(&self) -> usize {
        RgbImage::height(self) as usize
    }

    #[inline]
    fn channel(&self, x: usize, y: usize, channel: Channel) -> u8 {
        self.get_pixel(x as u32, y as u32).0[channel.rgb_index()]
    }
}

pub trait FrameBufferMut {
    fn set_channel(&mut self, x: usize, y: usize, channel: Channel, value: u8);
}

impl<F> FrameBufferMut for &mut F
where
    F: FrameBufferMut,
{
    #[inline]
    fn set_channel(&mut self, x: usize, y: usize, channel: Channel, value: u8) {
        (&mut **self).set_channel(x, y, channel, value);
    }
}

impl FrameBufferMut for RgbImage {
    #[inline]
    fn set_channel(&mut self, x: usize, y: usize, channel: Channel, value: u8) {
        self.get_pixel_mut(x as u32, y as u32).0[channel.rgb_index()] = value;
    }
}

/// Channel values of one image row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanLine {
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
    pub red: Vec<u8>,
}

impl ScanLine {
    /// A black line.
    pub fn new(width: usize) -> Self {
        Self {
            green: vec![0; width],
            blue: vec![0; width],
            red: vec![0; width],
        }
    }

    pub fn from_frame_buffer<F>(frame_buffer: &F, y: usize) -> Self
    where
        F: FrameBuffer,
    {
        let width = frame_buffer.width();
        let row = |channel| {
            (0..width)
                .map(|x| frame_buffer.channel(x, y, channel))
                .collect::<Vec<u8>>()
        };
        Self {
            green: row(Channel::Green),
            blue: row(Channel::Blue),
            red: row(Channel::Red),
        }
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> &[u8] {
        match channel {
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
            Channel::Red => &self.red,
        }
    }

    #[inline]
    pub fn channel_mut(&mut self, channel: Channel) -> &mut [u8] {
        match channel {
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
            Channel::Red => &mut self.red,
        }
    }

    pub fn write_to<F>(&self, frame_buffer: &mut F, y: usize)
    where
        F: FrameBufferMut,
    {
        let mut channel = Some(Channel::default());
        while let Some(current) = channel {
            for (x, &value) in self.channel(current).iter().enumerate() {
                frame_buffer.set_channel(x, y, current, value);
            }
            channel = current.next();
        }
    }
}

/// Resizes an image to the dimensions `mode` transmits.
pub fn fit_to_mode(image: &RgbImage, mode: &ModeSpecification) -> RgbImage {
    let width = mode.pixels_per_line as u32;
    let height = mode.num_lines as u32;
    if image.dimensions() == (width, height) {
        image.clone()
    }
    else {
        tracing::debug!(
            from = ?image.dimensions(),
            to = ?(width, height),
            "resizing image"
        );
        imageops::resize(image, width, height, FilterType::Triangle)
    }
}
